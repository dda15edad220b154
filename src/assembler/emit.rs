//! Pass 5: binary emission (spec §4.8 pass 5, §6.1).
//!
//! Walks the code graph once more, this time writing concrete bytes:
//! known bytes pass through, `AddressRef`/`PageRef` params are patched
//! against the addresses pass 4 resolved.

use super::graph::{CodeGraph, CodeNode, DataNode, Param};
use super::resolve::{ResolvedAddresses, PAGE_SIZE};
use crate::error::{Diagnostic, LayoutErrorKind, Location};

pub struct Emitted {
    pub data_bytes: Vec<u8>,
    pub code_bytes: Vec<u8>,
}

pub fn emit(graph: &CodeGraph, resolved: &ResolvedAddresses) -> (Emitted, Vec<Diagnostic>) {
    let mut diagnostics = Vec::new();
    let data_bytes = emit_data_segment(resolved);
    let code_bytes = emit_code_segment(graph, resolved, &mut diagnostics);
    (Emitted { data_bytes, code_bytes }, diagnostics)
}

fn emit_data_segment(resolved: &ResolvedAddresses) -> Vec<u8> {
    let mut out = Vec::new();
    let last = resolved.page_bytes.len().saturating_sub(1);
    for (idx, page) in resolved.page_bytes.iter().enumerate() {
        out.extend_from_slice(page);
        if idx != last {
            out.resize(out.len() + (PAGE_SIZE as usize - page.len()), 0);
        }
    }
    out
}

fn resolve_word(
    param: &Param,
    resolved: &ResolvedAddresses,
    location: Location,
    diagnostics: &mut Vec<Diagnostic>,
) -> [u8; 2] {
    match param {
        Param::AddressRef { symbol, offset } => {
            if let Some(addr) = resolved.code.get(symbol) {
                (((*addr as i64) + offset) as u16).to_le_bytes()
            } else if let Some(addr) = resolved.data.get(symbol) {
                (((addr.offset as i64) + offset) as u16).to_le_bytes()
            } else {
                diagnostics.push(Diagnostic {
                    location,
                    kind: LayoutErrorKind::UnresolvedReference(symbol.clone()).into(),
                });
                [0, 0]
            }
        }
        Param::PageRef(name) => {
            if let Some(idx) = resolved.pages.get(name) {
                idx.to_le_bytes()
            } else {
                diagnostics.push(Diagnostic {
                    location,
                    kind: LayoutErrorKind::UnresolvedReference(name.clone()).into(),
                });
                [0, 0]
            }
        }
        Param::Byte(_) => unreachable!("resolve_word called on a non-word param"),
    }
}

fn emit_code_segment(
    graph: &CodeGraph,
    resolved: &ResolvedAddresses,
    diagnostics: &mut Vec<Diagnostic>,
) -> Vec<u8> {
    let mut out = Vec::new();
    for node in &graph.code_nodes {
        let CodeNode::Instruction { opcode, params, location } = node else { continue };
        out.push(*opcode);
        for param in params {
            match param {
                Param::Byte(b) => out.push(*b),
                Param::AddressRef { .. } | Param::PageRef(_) => {
                    out.extend_from_slice(&resolve_word(param, resolved, *location, diagnostics));
                }
            }
        }
    }
    out
}

/// Patches every `DA` block's placeholder bytes with its refs' resolved
/// word addresses. Returns the patched data segment.
pub fn patch_address_arrays(
    graph: &CodeGraph,
    resolved: &ResolvedAddresses,
    mut data_bytes: Vec<u8>,
) -> Vec<u8> {
    for node in &graph.data_nodes {
        let DataNode::AddressArray { label, refs, .. } = node else { continue };
        let Some(array_addr) = resolved.data.get(label) else { continue };
        let page_base = array_addr.page as usize * PAGE_SIZE as usize;
        // +2 skips the array's own size prefix to reach its payload slots.
        let payload_base = page_base + array_addr.offset as usize + 2;
        for (i, r) in refs.iter().enumerate() {
            let bytes = if let Some(addr) = resolved.data.get(r) {
                addr.offset.to_le_bytes()
            } else if let Some(addr) = resolved.code.get(r) {
                addr.to_le_bytes()
            } else {
                [0, 0]
            };
            let slot = payload_base + i * 2;
            if slot + 1 < data_bytes.len() {
                data_bytes[slot] = bytes[0];
                data_bytes[slot + 1] = bytes[1];
            }
        }
    }
    data_bytes
}
