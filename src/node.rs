//! `Node`: a named record of properties and ordered children.
//!
//! Grounded on `sfbxNode.cpp`/`.h`: a fixed 13-byte header
//! (end_offset/property_count/property_list_bytes/name_length), recursive
//! child parsing terminated by an all-zero null node, and a recursive size
//! computation used both to validate `end_offset` on read and to compute it
//! on write.

use crate::error::{FbxError, Result};
use crate::primitive::{ByteReader, ByteWriter};
use crate::property::Property;

/// Index into a [`crate::document::Document`]'s node arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub u32);

#[derive(Debug, Clone)]
pub struct Node {
    pub name: String,
    pub properties: Vec<Property>,
    pub children: Vec<NodeId>,
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn is_null(&self) -> bool {
        self.name.is_empty() && self.properties.is_empty() && self.children.is_empty()
    }

    pub fn property(&self, index: usize) -> Option<&Property> {
        self.properties.get(index)
    }

    fn property_list_bytes(&self, compress: bool) -> u64 {
        if compress {
            self.properties.iter().map(Property::serialized_size_compressed).sum()
        } else {
            self.properties.iter().map(Property::serialized_size).sum()
        }
    }
}

/// 13-byte record header read directly off the node list.
struct RawHeader {
    end_offset: u32,
    property_count: u32,
    property_list_bytes: u32,
    name_length: u8,
}

fn read_header(r: &mut ByteReader) -> Result<RawHeader> {
    Ok(RawHeader {
        end_offset: r.read_u32()?,
        property_count: r.read_u32()?,
        property_list_bytes: r.read_u32()?,
        name_length: r.read_u8()?,
    })
}

/// Parses one node record (and its children, recursively) starting at the
/// reader's current position. `base_offset` is the absolute file offset
/// corresponding to `r`'s position 0, so that `base_offset + r.position()`
/// is always the true absolute file offset `end_offset` is expressed in.
///
/// Returns `None` when the record read is the null terminator.
pub fn parse_node(
    r: &mut ByteReader,
    base_offset: u64,
    arena: &mut Vec<Node>,
) -> Result<Option<NodeId>> {
    let header = read_header(r)?;
    if header.end_offset == 0
        && header.property_count == 0
        && header.property_list_bytes == 0
        && header.name_length == 0
    {
        return Ok(None);
    }

    let name_bytes = r.read_bytes(header.name_length as usize)?;
    let name = String::from_utf8_lossy(name_bytes).into_owned();

    let mut properties = Vec::with_capacity(header.property_count as usize);
    for _ in 0..header.property_count {
        properties.push(Property::read(r)?);
    }

    let mut children = Vec::new();
    while base_offset + r.position() as u64 < header.end_offset as u64 {
        match parse_node(r, base_offset, arena)? {
            Some(id) => children.push(id),
            None => break,
        }
    }

    let computed_end = base_offset + r.position() as u64;
    if computed_end != header.end_offset as u64 {
        return Err(FbxError::SizeInvariantViolated {
            computed: computed_end,
            declared: header.end_offset as u64,
        });
    }

    let node = Node {
        name,
        properties,
        children,
    };
    let id = NodeId(arena.len() as u32);
    arena.push(node);
    Ok(Some(id))
}

/// Recursive serialized size of the node at `id`:
/// `13 + name_len + Σ prop_sz + Σ child_sz`, plus 13 for the trailing null
/// node when children are present. `compress` must match the value passed
/// to the corresponding [`write_node`] call, since compressed array
/// properties serialize to a different size than raw ones.
pub fn node_size(id: NodeId, arena: &[Node], compress: bool) -> u64 {
    let n = &arena[id.0 as usize];
    let mut size = 13 + n.name.len() as u64 + n.property_list_bytes(compress);
    for &child in &n.children {
        size += node_size(child, arena, compress);
    }
    if !n.children.is_empty() {
        size += 13;
    }
    size
}

/// Serializes the node at `id` (and its children, recursively, terminated
/// by a null node) starting at absolute file offset `start_offset`.
/// `compress` selects DEFLATE encoding for array properties throughout the
/// subtree, per `WriteOptions::compress_arrays`.
pub fn write_node(id: NodeId, arena: &[Node], start_offset: u64, w: &mut ByteWriter, compress: bool) {
    let n = &arena[id.0 as usize];
    let end_offset = start_offset + node_size(id, arena, compress);

    w.write_u32(end_offset as u32);
    w.write_u32(n.properties.len() as u32);
    w.write_u32(n.property_list_bytes(compress) as u32);
    w.write_u8(n.name.len() as u8);
    w.write_bytes(n.name.as_bytes());
    for p in &n.properties {
        if compress {
            p.write_compressed(w);
        } else {
            p.write(w);
        }
    }

    let mut offset = start_offset + 13 + n.name.len() as u64 + n.property_list_bytes(compress);
    for &child in &n.children {
        write_node(child, arena, offset, w, compress);
        offset += node_size(child, arena, compress);
    }
    if !n.children.is_empty() {
        write_null_node(w);
    }
}

pub fn write_null_node(w: &mut ByteWriter) {
    w.write_u32(0);
    w.write_u32(0);
    w.write_u32(0);
    w.write_u8(0);
}

/// Textual dump of a node and its subtree, one level of tab indentation per
/// depth.
pub fn dump_node(id: NodeId, arena: &[Node], depth: usize, out: &mut String) {
    let n = &arena[id.0 as usize];
    out.push_str(&"\t".repeat(depth));
    out.push_str(&n.name);
    if !n.properties.is_empty() {
        out.push_str(": ");
        let rendered: Vec<String> = n.properties.iter().map(Property::to_dump_string).collect();
        out.push_str(&rendered.join(", "));
    }
    out.push('\n');
    for &child in &n.children {
        dump_node(child, arena, depth + 1, out);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(arena: &[Node], root: NodeId) -> Vec<Node> {
        round_trip_with(arena, root, false)
    }

    fn round_trip_with(arena: &[Node], root: NodeId, compress: bool) -> Vec<Node> {
        let mut w = ByteWriter::new();
        write_node(root, arena, 0, &mut w, compress);
        let bytes = w.into_bytes();
        let mut r = ByteReader::new(&bytes);
        let mut new_arena = Vec::new();
        parse_node(&mut r, 0, &mut new_arena).unwrap();
        new_arena
    }

    #[test]
    fn leaf_node_round_trips() {
        let mut arena = vec![Node {
            name: "Leaf".into(),
            properties: vec![Property::Int32(7), Property::String(b"hi".to_vec())],
            children: Vec::new(),
        }];
        let id = NodeId(0);
        arena[0].children.clear();
        let new_arena = round_trip(&arena, id);
        assert_eq!(new_arena[0].name, "Leaf");
        assert_eq!(new_arena[0].properties, arena[0].properties);
        assert!(new_arena[0].children.is_empty());
    }

    #[test]
    fn nested_children_round_trip_with_null_terminator() {
        let mut arena = Vec::new();
        let child = Node::new("Child");
        arena.push(child);
        let child_id = NodeId(0);
        let parent = Node {
            name: "Parent".into(),
            properties: Vec::new(),
            children: vec![child_id],
        };
        arena.push(parent);
        let parent_id = NodeId(1);

        let new_arena = round_trip(&arena, parent_id);
        assert_eq!(new_arena[new_arena.len() - 1].name, "Parent");
        assert_eq!(new_arena[new_arena.len() - 1].children.len(), 1);
    }

    #[test]
    fn node_size_matches_formula() {
        let mut arena = vec![Node::new("A")];
        arena[0].properties.push(Property::Int32(1));
        let id = NodeId(0);
        // 13 header + 1 name + (1 tag + 4 payload) property, no children
        assert_eq!(node_size(id, &arena, false), 13 + 1 + 5);
    }

    #[test]
    fn array_property_round_trips_under_compression() {
        let arena = vec![Node {
            name: "Arr".into(),
            properties: vec![Property::Int32Array(vec![1, 2, 3, 4, 5, 6, 7, 8])],
            children: Vec::new(),
        }];
        let id = NodeId(0);
        let new_arena = round_trip_with(&arena, id, true);
        assert_eq!(new_arena[0].properties, arena[0].properties);
    }
}
