//! Textual ASCII dump of a parsed node tree.
//!
//! Grounded on `sfbxDocument.cpp`'s `Document::writeAscii` style header
//! comment plus `Node::print`, reusing [`crate::node::dump_node`] for the
//! per-node rendering.

use crate::node::{dump_node, Node, NodeId};
use crate::tokens::{CREATION_TIME, CREATOR, FILE_ID};

/// Renders `roots` as an ASCII `.fbx` dump: a version header comment
/// followed by each root node's subtree. `FileId`/`CreationTime`/`Creator`
/// root nodes are skipped since they carry no meaningful textual content
/// (binary blob / machine-generated timestamp).
pub fn dump_ascii(version: u32, roots: &[NodeId], arena: &[Node]) -> String {
    let major = version / 1000;
    let minor = (version / 100) % 10;
    let mut out = format!("; FBX {major}.{minor}.0 project file\n");

    for &root in roots {
        let name = &arena[root.0 as usize].name;
        if name == FILE_ID || name == CREATION_TIME || name == CREATOR {
            continue;
        }
        dump_node(root, arena, 0, &mut out);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::Property;

    #[test]
    fn header_reports_major_minor() {
        let arena = vec![Node::new("Empty")];
        let out = dump_ascii(7700, &[NodeId(0)], &arena);
        assert!(out.starts_with("; FBX 7.7.0 project file\n"));
    }

    #[test]
    fn skips_file_id_creation_time_and_creator() {
        let mut arena = Vec::new();
        arena.push(Node {
            name: FILE_ID.to_string(),
            properties: vec![Property::Blob(vec![1, 2, 3])],
            children: Vec::new(),
        });
        arena.push(Node::new("Objects"));
        let roots = vec![NodeId(0), NodeId(1)];
        let out = dump_ascii(7700, &roots, &arena);
        assert!(!out.contains("FileId"));
        assert!(out.contains("Objects"));
    }
}
