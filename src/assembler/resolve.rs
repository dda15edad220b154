//! Pass 4: address resolution (spec §4.8 pass 4).
//!
//! Two sweeps: data-segment layout (assigns every data label a page
//! index and an in-page offset) then code-segment layout (assigns
//! every code label its byte offset). Addresses emitted into
//! instructions are always the in-page 16-bit offset — selecting the
//! page itself is the running program's job (`PAGE`), per spec §9's
//! page-select design note.

use std::collections::HashMap;

use super::graph::{CodeGraph, CodeNode, DataNode, Param};
use crate::error::{Diagnostic, LayoutErrorKind};

pub const PAGE_SIZE: u32 = 0x1_0000;

#[derive(Debug, Clone, Copy)]
pub struct DataAddress {
    pub page: u16,
    pub offset: u16,
}

#[derive(Debug, Default)]
pub struct ResolvedAddresses {
    pub data: HashMap<String, DataAddress>,
    pub code: HashMap<String, u16>,
    pub pages: HashMap<String, u16>,
    pub page_bytes: Vec<Vec<u8>>,
}

pub fn resolve(graph: &CodeGraph) -> (ResolvedAddresses, Vec<Diagnostic>) {
    let mut resolved = ResolvedAddresses::default();
    let mut diagnostics = Vec::new();

    let mut page_order: Vec<Option<String>> = vec![None];
    for node in &graph.data_nodes {
        let page = match node {
            DataNode::Block { page, .. } => page,
            DataNode::AddressArray { page, .. } => page,
        };
        if let Some(name) = page {
            if !page_order.iter().any(|p| p.as_deref() == Some(name.as_str())) {
                page_order.push(Some(name.clone()));
            }
        }
    }
    for (idx, page) in page_order.iter().enumerate() {
        if let Some(name) = page {
            resolved.pages.insert(name.clone(), idx as u16);
        }
    }

    let mut page_bufs: Vec<Vec<u8>> = vec![Vec::new(); page_order.len()];
    let page_index = |page: &Option<String>, order: &[Option<String>]| -> u16 {
        order.iter().position(|p| p == page).unwrap_or(0) as u16
    };

    // Every data block is prefixed with its own little-endian u16 byte
    // count; a label's address points at that prefix, not the payload.
    for node in &graph.data_nodes {
        match node {
            DataNode::Block { label, page, bytes } => {
                let idx = page_index(page, &page_order);
                let offset = page_bufs[idx as usize].len() as u16;
                page_bufs[idx as usize].extend_from_slice(&(bytes.len() as u16).to_le_bytes());
                page_bufs[idx as usize].extend_from_slice(bytes);
                resolved.data.insert(label.clone(), DataAddress { page: idx, offset });
            }
            DataNode::AddressArray { label, page, refs, .. } => {
                let idx = page_index(page, &page_order);
                let offset = page_bufs[idx as usize].len() as u16;
                let payload_len = (refs.len() * 2) as u16;
                page_bufs[idx as usize].extend_from_slice(&payload_len.to_le_bytes());
                page_bufs[idx as usize].extend(std::iter::repeat(0u8).take(refs.len() * 2));
                resolved.data.insert(label.clone(), DataAddress { page: idx, offset });
            }
        }
    }

    for node in &graph.data_nodes {
        if let DataNode::AddressArray { refs, location, .. } = node {
            let mut pages_seen: Vec<u16> = refs
                .iter()
                .filter_map(|r| resolved.data.get(r).map(|a| a.page))
                .collect();
            pages_seen.dedup();
            if pages_seen.len() > 1 {
                diagnostics.push(Diagnostic {
                    location: *location,
                    kind: LayoutErrorKind::CrossPageAddressArray.into(),
                });
            }
        }
    }

    resolved.page_bytes = page_bufs;

    let mut offset: u32 = 0;
    for node in &graph.code_nodes {
        match node {
            CodeNode::Label { name } => {
                resolved.code.insert(name.clone(), offset as u16);
            }
            CodeNode::Instruction { params, .. } => {
                offset += 1;
                offset += params.iter().map(param_len).sum::<u32>();
            }
        }
    }

    (resolved, diagnostics)
}

fn param_len(param: &Param) -> u32 {
    match param {
        Param::Byte(_) => 1,
        Param::AddressRef { .. } | Param::PageRef(_) => 2,
    }
}
