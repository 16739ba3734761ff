//! Minimal dag-pb codec.
//!
//! ```text
//! PBNode { Links = 2 (repeated PBLink), Data = 1 (bytes) }
//! PBLink { Hash = 1 (bytes), Name = 2 (string), Tsize = 3 (uint64) }
//! ```
//!
//! Links are written before data, as canonical dag-pb requires.

use crate::error::{Error, Result};
use cid::Cid;

const WIRE_VARINT: u64 = 0;
const WIRE_I64: u64 = 1;
const WIRE_LEN: u64 = 2;
const WIRE_I32: u64 = 5;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PbLink {
    pub hash: Option<Cid>,
    pub name: Option<String>,
    pub tsize: Option<u64>,
}

impl PbLink {
    pub fn new(hash: Cid) -> Self {
        Self {
            hash: Some(hash),
            ..Default::default()
        }
    }

    pub fn named(hash: Cid, name: impl Into<String>, tsize: u64) -> Self {
        Self {
            hash: Some(hash),
            name: Some(name.into()),
            tsize: Some(tsize),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PbNode {
    pub links: Vec<PbLink>,
    pub data: Option<Vec<u8>>,
}

impl PbNode {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for link in &self.links {
            let encoded = encode_link(link);
            write_key(&mut out, 2, WIRE_LEN);
            write_bytes(&mut out, &encoded);
        }
        if let Some(data) = &self.data {
            write_key(&mut out, 1, WIRE_LEN);
            write_bytes(&mut out, data);
        }
        out
    }

    pub fn decode(bytes: &[u8]) -> Result<Self> {
        let mut node = PbNode::default();
        let mut reader = Reader::new(bytes);
        while !reader.is_empty() {
            let (field, wire) = reader.key()?;
            match (field, wire) {
                (1, WIRE_LEN) => node.data = Some(reader.bytes()?.to_vec()),
                (2, WIRE_LEN) => node.links.push(decode_link(reader.bytes()?)?),
                _ => reader.skip(wire)?,
            }
        }
        Ok(node)
    }
}

/// Child CIDs of an encoded node, in link order.
pub fn decode_links(bytes: &[u8]) -> Result<Vec<Cid>> {
    PbNode::decode(bytes)?
        .links
        .into_iter()
        .enumerate()
        .map(|(i, link)| {
            link.hash
                .ok_or_else(|| Error::Codec(format!("dag-pb link {i} has no hash")))
        })
        .collect()
}

fn encode_link(link: &PbLink) -> Vec<u8> {
    let mut out = Vec::new();
    if let Some(hash) = &link.hash {
        write_key(&mut out, 1, WIRE_LEN);
        write_bytes(&mut out, &hash.to_bytes());
    }
    if let Some(name) = &link.name {
        write_key(&mut out, 2, WIRE_LEN);
        write_bytes(&mut out, name.as_bytes());
    }
    if let Some(tsize) = link.tsize {
        write_key(&mut out, 3, WIRE_VARINT);
        write_varint(&mut out, tsize);
    }
    out
}

fn decode_link(bytes: &[u8]) -> Result<PbLink> {
    let mut link = PbLink::default();
    let mut reader = Reader::new(bytes);
    while !reader.is_empty() {
        let (field, wire) = reader.key()?;
        match (field, wire) {
            (1, WIRE_LEN) => {
                let raw = reader.bytes()?;
                let cid = Cid::try_from(raw)
                    .map_err(|e| Error::Codec(format!("dag-pb link hash is not a CID: {e}")))?;
                link.hash = Some(cid);
            }
            (2, WIRE_LEN) => {
                let name = std::str::from_utf8(reader.bytes()?)
                    .map_err(|e| Error::Codec(format!("dag-pb link name is not UTF-8: {e}")))?;
                link.name = Some(name.to_string());
            }
            (3, WIRE_VARINT) => link.tsize = Some(reader.varint()?),
            _ => reader.skip(wire)?,
        }
    }
    Ok(link)
}

fn write_key(out: &mut Vec<u8>, field: u64, wire: u64) {
    write_varint(out, (field << 3) | wire);
}

fn write_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    write_varint(out, bytes.len() as u64);
    out.extend_from_slice(bytes);
}

fn write_varint(out: &mut Vec<u8>, mut value: u64) {
    while value >= 0x80 {
        out.push((value as u8) | 0x80);
        value >>= 7;
    }
    out.push(value as u8);
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    fn new(buf: &'a [u8]) -> Self {
        Self { buf }
    }

    fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    fn varint(&mut self) -> Result<u64> {
        let mut value = 0u64;
        for (i, byte) in self.buf.iter().enumerate().take(10) {
            value |= u64::from(byte & 0x7f) << (7 * i);
            if byte & 0x80 == 0 {
                self.buf = &self.buf[i + 1..];
                return Ok(value);
            }
        }
        Err(Error::Codec("truncated or overlong varint".to_string()))
    }

    fn key(&mut self) -> Result<(u64, u64)> {
        let key = self.varint()?;
        Ok((key >> 3, key & 0x7))
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8]> {
        if len > self.buf.len() {
            return Err(Error::Codec(format!(
                "field of {len} bytes overruns the {} remaining",
                self.buf.len()
            )));
        }
        let (head, tail) = self.buf.split_at(len);
        self.buf = tail;
        Ok(head)
    }

    fn bytes(&mut self) -> Result<&'a [u8]> {
        let len = usize::try_from(self.varint()?)
            .map_err(|_| Error::Codec("length does not fit in memory".to_string()))?;
        self.take(len)
    }

    fn skip(&mut self, wire: u64) -> Result<()> {
        match wire {
            WIRE_VARINT => self.varint().map(|_| ()),
            WIRE_I64 => self.take(8).map(|_| ()),
            WIRE_LEN => self.bytes().map(|_| ()),
            WIRE_I32 => self.take(4).map(|_| ()),
            other => Err(Error::Codec(format!("unsupported wire type {other}"))),
        }
    }
}
