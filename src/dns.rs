//! DNS message parsing and construction.

use std::net::Ipv4Addr;

use crate::error::EncodeError;

const HEADER_LEN: usize = 12;

/// Upper bound on compression pointers followed while reading one name.
const MAX_POINTER_HOPS: usize = 16;

/// Longest name allowed on the wire, length octets and root label included.
const MAX_NAME_LEN: usize = 255;

const FLAG_RESPONSE: u16 = 0x8000;
const FLAG_OPCODE: u16 = 0x7800;
const FLAG_AUTHORITATIVE: u16 = 0x0400;
const FLAG_RECURSION_DESIRED: u16 = 0x0100;
const FLAG_CHECKING_DISABLED: u16 = 0x0010;

/// Record type A.
pub const TYPE_A: u16 = 1;
/// Class IN.
pub const CLASS_IN: u16 = 1;

/// TTL given to every synthesized answer.
pub const ANSWER_TTL: u32 = 3600;

/// A parsed DNS query.
#[derive(Debug, Clone)]
pub struct DnsQuery {
    pub id: u16,
    pub flags: u16,
    pub questions: Vec<DnsQuestion>,
}

impl DnsQuery {
    /// Parse a DNS query from raw bytes.
    ///
    /// Question names are returned as written on the wire (no case folding),
    /// terminated by a trailing dot.
    pub fn parse(data: &[u8]) -> Option<Self> {
        if data.len() < HEADER_LEN {
            return None;
        }

        let id = u16::from_be_bytes([data[0], data[1]]);
        let flags = u16::from_be_bytes([data[2], data[3]]);
        let qdcount = u16::from_be_bytes([data[4], data[5]]) as usize;

        let mut pos = HEADER_LEN;
        let mut questions = Vec::with_capacity(qdcount.min(8));

        for _ in 0..qdcount {
            let (domain, next) = read_name(data, pos)?;
            pos = next;

            if pos + 4 > data.len() {
                return None;
            }
            let qtype = u16::from_be_bytes([data[pos], data[pos + 1]]);
            let qclass = u16::from_be_bytes([data[pos + 2], data[pos + 3]]);
            pos += 4;

            questions.push(DnsQuestion {
                domain,
                qtype,
                qclass,
            });
        }

        Some(Self {
            id,
            flags,
            questions,
        })
    }

    /// True unless the QR bit marks this message as a response.
    pub fn is_query(&self) -> bool {
        self.flags & FLAG_RESPONSE == 0
    }

    /// Start an authoritative, answerless reply to this query.
    ///
    /// Copies the ID, opcode, RD and CD bits and echoes every question.
    pub fn reply(&self) -> DnsResponse {
        let copied = self.flags & (FLAG_OPCODE | FLAG_RECURSION_DESIRED | FLAG_CHECKING_DISABLED);

        DnsResponse {
            id: self.id,
            flags: FLAG_RESPONSE | FLAG_AUTHORITATIVE | copied,
            questions: self.questions.clone(),
            answers: Vec::new(),
        }
    }
}

/// A DNS question section entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DnsQuestion {
    pub domain: String,
    pub qtype: u16,
    pub qclass: u16,
}

impl DnsQuestion {
    /// Whether this question asks for an IPv4 address in class IN.
    pub fn wants_address(&self) -> bool {
        self.qtype == TYPE_A && self.qclass == CLASS_IN
    }
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
    /// Build an A record binding `name` to `address`.
    pub fn a(name: &str, address: &str) -> Result<Self, EncodeError> {
        if name.split('.').any(|label| label.len() > 63) {
            return Err(EncodeError::LabelTooLong(name.to_string()));
        }

        let ip: Ipv4Addr = address
            .trim()
            .parse()
            .map_err(|_| EncodeError::InvalidAddress {
                name: name.to_string(),
                address: address.to_string(),
            })?;

        Ok(Self {
            name: name.to_string(),
            rtype: TYPE_A,
            class: CLASS_IN,
            ttl: ANSWER_TTL,
            rdata: ip.octets().to_vec(),
        })
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

impl DnsResponse {
    pub fn is_authoritative(&self) -> bool {
        self.flags & FLAG_AUTHORITATIVE != 0
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

        // Questions, remembering where each name starts for compression
        let mut offsets = Vec::with_capacity(self.questions.len());
        for q in &self.questions {
            offsets.push((q.domain.to_lowercase(), data.len()));
            Self::encode_domain(&mut data, &q.domain);
            data.extend_from_slice(&q.qtype.to_be_bytes());
            data.extend_from_slice(&q.qclass.to_be_bytes());
        }

        // Answers
        for a in &self.answers {
            let pointer = offsets
                .iter()
                .find(|(domain, offset)| *domain == a.name && *offset <= 0x3FFF)
                .map(|(_, offset)| 0xC000 | *offset as u16);

            match pointer {
                Some(ptr) => data.extend_from_slice(&ptr.to_be_bytes()),
                None => Self::encode_domain(&mut data, &a.name),
            }
            data.extend_from_slice(&a.rtype.to_be_bytes());
            data.extend_from_slice(&a.class.to_be_bytes());
            data.extend_from_slice(&a.ttl.to_be_bytes());
            data.extend_from_slice(&(a.rdata.len() as u16).to_be_bytes());
            data.extend_from_slice(&a.rdata);
        }

        data
    }

    fn encode_domain(buf: &mut Vec<u8>, domain: &str) {
        for label in domain.split('.').filter(|l| !l.is_empty()) {
            buf.push(label.len() as u8);
            buf.extend_from_slice(label.as_bytes());
        }
        buf.push(0);
    }
}

/// Read a possibly compressed name starting at `start`.
///
/// Returns the dotted name and the offset just past it in the original
/// position (not past any pointer target). Names longer than 255 octets
/// once expanded, and labels containing a `.`, are rejected.
pub(crate) fn read_name(data: &[u8], start: usize) -> Option<(String, usize)> {
    let mut labels = Vec::new();
    let mut pos = start;
    let mut end = None;
    let mut hops = 0;
    // Root label
    let mut wire_len = 1;

    loop {
        let len = *data.get(pos)? as usize;
        match len {
            0 => {
                pos += 1;
                break;
            }
            l if l & 0xC0 == 0xC0 => {
                let low = *data.get(pos + 1)? as usize;
                hops += 1;
                if hops > MAX_POINTER_HOPS {
                    return None;
                }
                end.get_or_insert(pos + 2);
                pos = ((l & 0x3F) << 8) | low;
            }
            l if l > 63 => return None,
            l => {
                wire_len += 1 + l;
                if wire_len > MAX_NAME_LEN {
                    return None;
                }
                let label = data.get(pos + 1..pos + 1 + l)?;
                if label.contains(&b'.') {
                    return None;
                }
                labels.push(std::str::from_utf8(label).ok()?);
                pos += 1 + l;
            }
        }
    }

    let mut name = labels.join(".");
    name.push('.');

    Some((name, end.unwrap_or(pos)))
}
