//! Packets: the unit of data in flight.
//!
//! A packet is a move-only value. Whoever holds it owns it, and the `owner`
//! field records that custody for bookkeeping: a component, the packet whose
//! chain it hangs on, or nobody while it sits in a connection queue.

use crate::error::{Result, RivuletError};
use crate::types::{ComponentId, PacketId};
use crate::value::Value;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of packet: data or a substream bracket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    /// Ordinary data packet.
    Normal,
    /// Opening bracket of a substream.
    Open,
    /// Closing bracket of a substream.
    Close,
}

impl fmt::Display for PacketKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => write!(f, "NORMAL"),
            Self::Open => write!(f, "OPEN"),
            Self::Close => write!(f, "CLOSE"),
        }
    }
}

/// Current custodian of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Owner {
    /// Held by a component during an activation.
    Component(ComponentId),
    /// Attached to a chain of another packet.
    Packet(PacketId),
}

/// A packet flowing through the network.
#[derive(Debug)]
pub struct Packet {
    id: PacketId,
    kind: PacketKind,
    content: Value,
    owner: Option<Owner>,
    chains: BTreeMap<String, Vec<Packet>>,
}

impl Packet {
    pub(crate) fn new(content: Value, kind: PacketKind, owner: Option<Owner>) -> Self {
        Self {
            id: PacketId::next(),
            kind,
            content,
            owner,
            chains: BTreeMap::new(),
        }
    }

    /// Get the packet ID.
    pub fn id(&self) -> PacketId {
        self.id
    }

    /// Get the packet kind.
    pub fn kind(&self) -> PacketKind {
        self.kind
    }

    /// Check if this is a data packet.
    pub fn is_normal(&self) -> bool {
        self.kind == PacketKind::Normal
    }

    /// Check if this is an opening bracket.
    pub fn is_open(&self) -> bool {
        self.kind == PacketKind::Open
    }

    /// Check if this is a closing bracket.
    pub fn is_close(&self) -> bool {
        self.kind == PacketKind::Close
    }

    /// Get the content.
    pub fn content(&self) -> &Value {
        &self.content
    }

    /// Get mutable access to the content.
    pub fn content_mut(&mut self) -> &mut Value {
        &mut self.content
    }

    pub(crate) fn set_content(&mut self, content: Value) {
        self.content = content;
    }

    pub(crate) fn into_content(self) -> Value {
        self.content
    }

    /// Get the current owner, `None` while in transit.
    pub fn owner(&self) -> Option<Owner> {
        self.owner
    }

    pub(crate) fn set_owner(&mut self, owner: Owner) {
        self.owner = Some(owner);
    }

    pub(crate) fn clear_owner(&mut self) {
        self.owner = None;
    }

    /// Check if the packet is held by the given component.
    pub fn is_owned_by(&self, component: ComponentId) -> bool {
        self.owner == Some(Owner::Component(component))
    }

    /// Get the members of a named chain.
    pub fn chain(&self, name: &str) -> Option<&[Packet]> {
        self.chains.get(name).map(Vec::as_slice)
    }

    /// Names of all non-empty chains.
    pub fn chain_names(&self) -> impl Iterator<Item = &str> {
        self.chains.keys().map(String::as_str)
    }

    /// Check whether `id` is this packet or appears anywhere in its chains.
    pub fn contains(&self, id: PacketId) -> bool {
        self.id == id
            || self
                .chains
                .values()
                .flatten()
                .any(|member| member.contains(id))
    }

    /// Number of packets in this tree, the root included.
    pub fn tree_size(&self) -> usize {
        1 + self
            .chains
            .values()
            .flatten()
            .map(Packet::tree_size)
            .sum::<usize>()
    }

    /// Copy this packet under a fresh ID.
    ///
    /// Content and kind are shared, the owner is kept and chain members are
    /// duplicated recursively so the copy is an independent tree.
    pub(crate) fn duplicate(&self) -> Packet {
        let id = PacketId::next();
        let chains = self
            .chains
            .iter()
            .map(|(name, members)| {
                let copies = members
                    .iter()
                    .map(|member| {
                        let mut copy = member.duplicate();
                        copy.owner = Some(Owner::Packet(id));
                        copy
                    })
                    .collect();
                (name.clone(), copies)
            })
            .collect();

        Packet {
            id,
            kind: self.kind,
            content: self.content.clone(),
            owner: self.owner,
            chains,
        }
    }

    /// Hang `sub` on the named chain of this packet.
    pub(crate) fn attach(&mut self, chain: &str, mut sub: Packet) -> Result<()> {
        if self.contains(sub.id) || sub.contains(self.id) {
            return Err(RivuletError::CyclicChain {
                packet: self.id,
                subpacket: sub.id,
            });
        }
        sub.owner = Some(Owner::Packet(self.id));
        self.chains.entry(chain.to_string()).or_default().push(sub);
        Ok(())
    }

    /// Remove a member from the named chain and hand it back unowned.
    pub(crate) fn detach(&mut self, chain: &str, member: PacketId) -> Result<Packet> {
        let not_found = || RivuletError::ChainMemberNotFound {
            packet: self.id,
            chain: chain.to_string(),
            member,
        };

        let members = self.chains.get_mut(chain).ok_or_else(not_found)?;
        let pos = members
            .iter()
            .position(|p| p.id == member)
            .ok_or_else(not_found)?;
        let mut sub = members.remove(pos);
        if members.is_empty() {
            self.chains.remove(chain);
        }
        sub.owner = None;
        Ok(sub)
    }
}
