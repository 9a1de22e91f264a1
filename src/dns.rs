//! DNS message parsing and construction.
//!
//! Only the parts needed to ask for an A record and read the answer
//! section back are implemented. Authority and additional sections of a
//! response are ignored.

use std::net::Ipv4Addr;

use thiserror::Error;

const HEADER_LEN: usize = 12;
const MAX_LABEL_LEN: usize = 63;
const MAX_NAME_LEN: usize = 255;
const MAX_POINTER_HOPS: usize = 32;

pub const TYPE_A: u16 = 1;
pub const TYPE_CNAME: u16 = 5;
pub const TYPE_OPT: u16 = 41;
pub const CLASS_IN: u16 = 1;

/// Standard query, recursion desired.
const QUERY_FLAGS: u16 = 0x0100;
/// Advertised EDNS0 UDP payload size.
pub const EDNS_PAYLOAD_SIZE: u16 = 4096;
/// DNSSEC OK bit inside the OPT record's TTL field.
const EDNS_DO_BIT: u32 = 0x8000;

/// Errors from encoding or decoding DNS messages.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    #[error("label {0:?} is longer than 63 bytes")]
    LabelTooLong(String),
    #[error("name is longer than 255 bytes")]
    NameTooLong,
    #[error("message truncated")]
    Truncated,
    #[error("too many compression pointers")]
    PointerLoop,
}

/// A DNS query with a single question.
#[derive(Debug, Clone)]
pub struct DnsQuery {
    pub id: u16,
    pub domain: String,
    pub qtype: u16,
    pub qclass: u16,
    /// EDNS0 payload size, if an OPT record is attached.
    pub udp_payload_size: Option<u16>,
}

impl DnsQuery {
    /// Build an A/IN query for `domain` with EDNS0 enabled.
    pub fn a_record(domain: &str, id: u16) -> Self {
        Self {
            id,
            domain: domain.trim_end_matches('.').to_string(),
            qtype: TYPE_A,
            qclass: CLASS_IN,
            udp_payload_size: Some(EDNS_PAYLOAD_SIZE),
        }
    }

    /// Parse a DNS query from raw bytes.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN + 1 {
            return None;
        }

        let id = u16::from_be_bytes([data[0], data[1]]);
        let arcount = u16::from_be_bytes([data[10], data[11]]);

        let (domain, pos) = read_name(data, HEADER_LEN).ok()?;
        if domain.is_empty() {
            return None;
        }

        let qtype = read_u16(data, pos).ok()?;
        let qclass = read_u16(data, pos + 2).ok()?;

        // An OPT record is a root name followed by type 41 and the payload size.
        let mut udp_payload_size = None;
        let opt = pos + 4;
        if arcount > 0 && data.get(opt) == Some(&0) && read_u16(data, opt + 1).ok() == Some(TYPE_OPT)
        {
            udp_payload_size = read_u16(data, opt + 3).ok();
        }

        Some(Self {
            id,
            domain: domain.to_lowercase(),
            qtype,
            qclass,
            udp_payload_size,
        })
    }

    /// Encode the query to wire format bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CodecError> {
        validate_name(&self.domain)?;

        let mut data = Vec::with_capacity(HEADER_LEN + self.domain.len() + 2 + 4 + 11);
        let arcount: u16 = if self.udp_payload_size.is_some() { 1 } else { 0 };

        data.extend_from_slice(&self.id.to_be_bytes());
        data.extend_from_slice(&QUERY_FLAGS.to_be_bytes());
        data.extend_from_slice(&1u16.to_be_bytes()); // QDCOUNT
        data.extend_from_slice(&[0x00, 0x00]); // ANCOUNT
        data.extend_from_slice(&[0x00, 0x00]); // NSCOUNT
        data.extend_from_slice(&arcount.to_be_bytes());

        push_name(&mut data, &self.domain);
        data.extend_from_slice(&self.qtype.to_be_bytes());
        data.extend_from_slice(&self.qclass.to_be_bytes());

        if let Some(size) = self.udp_payload_size {
            data.push(0); // root owner name
            data.extend_from_slice(&TYPE_OPT.to_be_bytes());
            data.extend_from_slice(&size.to_be_bytes());
            data.extend_from_slice(&EDNS_DO_BIT.to_be_bytes());
            data.extend_from_slice(&[0x00, 0x00]); // RDLENGTH
        }

        Ok(data)
    }
}

/// A DNS response.
#[derive(Debug, Clone)]
pub struct DnsResponse {
    pub id: u16,
    pub flags: u16,
    pub questions: Vec<DnsQuestion>,
    pub answers: Vec<DnsRecord>,
}

/// A DNS question section entry.
#[derive(Debug, Clone)]
pub struct DnsQuestion {
    pub domain: String,
    pub qtype: u16,
    pub qclass: u16,
}

/// A DNS resource record.
#[derive(Debug, Clone)]
pub struct DnsRecord {
    pub name: String,
    pub rtype: u16,
    pub class: u16,
    pub ttl: u32,
    pub rdata: Vec<u8>,
}

impl DnsRecord {
    /// An A record pointing `name` at `addr`.
    pub fn a(name: &str, addr: Ipv4Addr, ttl: u32) -> Self {
        Self {
            name: name.to_string(),
            rtype: TYPE_A,
            class: CLASS_IN,
            ttl,
            rdata: addr.octets().to_vec(),
        }
    }
}

impl DnsResponse {
    /// Create a response to `query` carrying `answers`.
    pub fn for_query(query: &DnsQuery, answers: Vec<DnsRecord>) -> Self {
        Self {
            id: query.id,
            flags: 0x8180, // Standard response, recursion available, no error
            questions: vec![DnsQuestion {
                domain: query.domain.clone(),
                qtype: query.qtype,
                qclass: query.qclass,
            }],
            answers,
        }
    }

    /// Parse a response, reading the question and answer sections.
    pub fn parse(data: &[u8]) -> Result<Self, CodecError> {
        if data.len() < HEADER_LEN {
            return Err(CodecError::Truncated);
        }

        let id = read_u16(data, 0)?;
        let flags = read_u16(data, 2)?;
        let qdcount = read_u16(data, 4)?;
        let ancount = read_u16(data, 6)?;

        let mut pos = HEADER_LEN;

        let mut questions = Vec::with_capacity(qdcount as usize);
        for _ in 0..qdcount {
            let (domain, next) = read_name(data, pos)?;
            questions.push(DnsQuestion {
                domain,
                qtype: read_u16(data, next)?,
                qclass: read_u16(data, next + 2)?,
            });
            pos = next + 4;
        }

        let mut answers = Vec::with_capacity(ancount as usize);
        for _ in 0..ancount {
            let (name, next) = read_name(data, pos)?;
            let rtype = read_u16(data, next)?;
            let class = read_u16(data, next + 2)?;
            let ttl = read_u32(data, next + 4)?;
            let rdlength = read_u16(data, next + 8)? as usize;
            let start = next + 10;
            let rdata = data
                .get(start..start + rdlength)
                .ok_or(CodecError::Truncated)?
                .to_vec();
            answers.push(DnsRecord {
                name,
                rtype,
                class,
                ttl,
                rdata,
            });
            pos = start + rdlength;
        }

        Ok(Self {
            id,
            flags,
            questions,
            answers,
        })
    }

    /// The address of the first well-formed A record in the answer section.
    pub fn first_ipv4(&self) -> Option<Ipv4Addr> {
        self.answers.iter().find_map(|record| {
            if record.rtype != TYPE_A {
                return None;
            }
            let octets: [u8; 4] = record.rdata.as_slice().try_into().ok()?;
            Some(Ipv4Addr::from(octets))
        })
    }

    /// Encode the response to wire format bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity(512);

        // Header
        data.extend_from_slice(&self.id.to_be_bytes());
        data.extend_from_slice(&self.flags.to_be_bytes());
        data.extend_from_slice(&(self.questions.len() as u16).to_be_bytes());
        data.extend_from_slice(&(self.answers.len() as u16).to_be_bytes());
        data.extend_from_slice(&[0x00, 0x00]); // NSCOUNT
        data.extend_from_slice(&[0x00, 0x00]); // ARCOUNT

        // Questions
        for q in &self.questions {
            push_name(&mut data, &q.domain);
            data.extend_from_slice(&q.qtype.to_be_bytes());
            data.extend_from_slice(&q.qclass.to_be_bytes());
        }

        // Answers
        for a in &self.answers {
            // Use compression pointer if this is the first question's domain
            if !self.questions.is_empty() && a.name == self.questions[0].domain {
                data.extend_from_slice(&[0xC0, 0x0C]); // Pointer to offset 12
            } else {
                push_name(&mut data, &a.name);
            }
            data.extend_from_slice(&a.rtype.to_be_bytes());
            data.extend_from_slice(&a.class.to_be_bytes());
            data.extend_from_slice(&a.ttl.to_be_bytes());
            data.extend_from_slice(&(a.rdata.len() as u16).to_be_bytes());
            data.extend_from_slice(&a.rdata);
        }

        data
    }
}

fn labels(domain: &str) -> impl Iterator<Item = &str> {
    domain.split('.').filter(|label| !label.is_empty())
}

fn validate_name(domain: &str) -> Result<(), CodecError> {
    let mut wire_len = 1;
    for label in labels(domain) {
        if label.len() > MAX_LABEL_LEN {
            return Err(CodecError::LabelTooLong(label.to_string()));
        }
        wire_len += 1 + label.len();
    }
    if wire_len > MAX_NAME_LEN {
        return Err(CodecError::NameTooLong);
    }
    Ok(())
}

fn push_name(buf: &mut Vec<u8>, domain: &str) {
    for label in labels(domain) {
        buf.push(label.len() as u8);
        buf.extend_from_slice(label.as_bytes());
    }
    buf.push(0);
}

/// Read a possibly compressed name starting at `start`.
///
/// Returns the dotted name and the offset just past it in the original
/// position (not past any pointer target).
fn read_name(data: &[u8], start: usize) -> Result<(String, usize), CodecError> {
    let mut parts = Vec::new();
    let mut pos = start;
    let mut resume = None;
    let mut hops = 0;

    loop {
        let len = *data.get(pos).ok_or(CodecError::Truncated)? as usize;
        if len == 0 {
            pos += 1;
            break;
        }
        if len & 0xC0 == 0xC0 {
            let low = *data.get(pos + 1).ok_or(CodecError::Truncated)? as usize;
            resume.get_or_insert(pos + 2);
            hops += 1;
            if hops > MAX_POINTER_HOPS {
                return Err(CodecError::PointerLoop);
            }
            pos = ((len & 0x3F) << 8) | low;
            continue;
        }
        let label = data
            .get(pos + 1..pos + 1 + len)
            .ok_or(CodecError::Truncated)?;
        parts.push(String::from_utf8_lossy(label).into_owned());
        pos += 1 + len;
    }

    Ok((parts.join("."), resume.unwrap_or(pos)))
}

fn read_u16(data: &[u8], pos: usize) -> Result<u16, CodecError> {
    data.get(pos..pos + 2)
        .map(|b| u16::from_be_bytes([b[0], b[1]]))
        .ok_or(CodecError::Truncated)
}

fn read_u32(data: &[u8], pos: usize) -> Result<u32, CodecError> {
    data.get(pos..pos + 4)
        .map(|b| u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or(CodecError::Truncated)
}
