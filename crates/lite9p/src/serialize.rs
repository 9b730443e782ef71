//! Serialize/deserialize 9P fields into/from binary.
//!
//! Every command is described by a template over a fixed field alphabet:
//!
//! | code | field  | encoding                                   |
//! |------|--------|--------------------------------------------|
//! | `B`  | byte   | 1 byte                                     |
//! | `W`  | word   | 2 bytes, little endian                     |
//! | `L`  | long   | 4 bytes, little endian                     |
//! | `Q`  | quad   | 8 bytes, little endian                     |
//! | `S`  | string | length[2] followed by that many raw bytes  |
//! | `I`  | qid    | type[1] version[4] path[8]                 |
//!
//! [`decode_fields`] and [`encode_fields`] walk a template and never look at
//! the command code, so a new command only needs a new template.

use crate::{error::CodecError, fcall::*};
use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use std::io::{self, Read};
use std::mem;
use std::ops::Shl;

type Result<T> = ::std::result::Result<T, CodecError>;

/// One character of a template
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum FieldType {
    Byte,
    Word,
    Long,
    Quad,
    Str,
    QId,
}

impl TryFrom<char> for FieldType {
    type Error = CodecError;

    fn try_from(c: char) -> Result<Self> {
        match c {
            'B' => Ok(FieldType::Byte),
            'W' => Ok(FieldType::Word),
            'L' => Ok(FieldType::Long),
            'Q' => Ok(FieldType::Quad),
            'S' => Ok(FieldType::Str),
            'I' => Ok(FieldType::QId),
            _ => Err(CodecError::InvalidSpec(c)),
        }
    }
}

/// Parse a whole template, rejecting characters outside the alphabet.
pub fn parse_template(template: &str) -> Result<Vec<FieldType>> {
    template.chars().map(FieldType::try_from).collect()
}

/// A decoded field
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Value {
    Byte(u8),
    Word(u16),
    Long(u32),
    Quad(u64),
    Str(WireString),
    QId(QId),
}

impl Value {
    pub fn field_type(&self) -> FieldType {
        match self {
            Value::Byte(_) => FieldType::Byte,
            Value::Word(_) => FieldType::Word,
            Value::Long(_) => FieldType::Long,
            Value::Quad(_) => FieldType::Quad,
            Value::Str(_) => FieldType::Str,
            Value::QId(_) => FieldType::QId,
        }
    }
}

// Reads from a slice and writes into a Vec only fail on running out of bytes
fn eof_as_truncated(_: io::Error) -> CodecError {
    CodecError::Truncated
}

fn read_exact<R: Read + ?Sized>(r: &mut R, size: usize) -> Result<Vec<u8>> {
    let mut buf = vec![0; size];
    r.read_exact(&mut buf[..]).map_err(eof_as_truncated)?;
    Ok(buf)
}

/// A wrapper class of WriteBytesExt to provide operator overloads
/// for serializing
///
/// Operator '<<' serializes the right hand side argument into
/// the left hand side encoder
#[derive(Clone, Debug)]
pub struct Encoder<W> {
    writer: W,
    bytes: usize,
}

/// A serializing specific result to chain `<<`
pub struct SResult<T>(Result<T>);

impl<T> SResult<T> {
    pub fn into_result(self) -> Result<T> {
        self.0
    }
}

impl<W: WriteBytesExt> Encoder<W> {
    pub fn new(writer: W) -> Encoder<W> {
        Encoder { writer, bytes: 0 }
    }

    /// Return total bytes written
    pub fn bytes_written(&self) -> usize {
        self.bytes
    }

    /// Encode data, equivalent to: encoder << data
    pub fn encode<T: Encodable + ?Sized>(&mut self, data: &T) -> Result<usize> {
        let bytes = data.encode(&mut self.writer)?;
        self.bytes += bytes;
        Ok(bytes)
    }

    /// Get inner writer
    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<'a, T: Encodable, W: WriteBytesExt> Shl<&'a T> for Encoder<W> {
    type Output = SResult<Encoder<W>>;
    fn shl(mut self, rhs: &'a T) -> Self::Output {
        match self.encode(rhs) {
            Ok(_) => SResult(Ok(self)),
            Err(e) => SResult(Err(e)),
        }
    }
}

impl<'a, T: Encodable, W: WriteBytesExt> Shl<&'a T> for SResult<Encoder<W>> {
    type Output = Self;
    fn shl(self, rhs: &'a T) -> Self::Output {
        match self.0 {
            Ok(mut encoder) => match encoder.encode(rhs) {
                Ok(_) => SResult(Ok(encoder)),
                Err(e) => SResult(Err(e)),
            },
            Err(e) => SResult(Err(e)),
        }
    }
}

/// Trait representing a type which can be serialized into binary
pub trait Encodable {
    /// Encode self to w and returns the number of bytes encoded
    fn encode<W: WriteBytesExt>(&self, w: &mut W) -> Result<usize>;
}

impl Encodable for u8 {
    fn encode<W: WriteBytesExt>(&self, w: &mut W) -> Result<usize> {
        w.write_u8(*self).map_err(eof_as_truncated)?;
        Ok(mem::size_of::<Self>())
    }
}

impl Encodable for u16 {
    fn encode<W: WriteBytesExt>(&self, w: &mut W) -> Result<usize> {
        w.write_u16::<LittleEndian>(*self)
            .map_err(eof_as_truncated)?;
        Ok(mem::size_of::<Self>())
    }
}

impl Encodable for u32 {
    fn encode<W: WriteBytesExt>(&self, w: &mut W) -> Result<usize> {
        w.write_u32::<LittleEndian>(*self)
            .map_err(eof_as_truncated)?;
        Ok(mem::size_of::<Self>())
    }
}

impl Encodable for u64 {
    fn encode<W: WriteBytesExt>(&self, w: &mut W) -> Result<usize> {
        w.write_u64::<LittleEndian>(*self)
            .map_err(eof_as_truncated)?;
        Ok(mem::size_of::<Self>())
    }
}

impl Encodable for WireString {
    fn encode<W: WriteBytesExt>(&self, w: &mut W) -> Result<usize> {
        let len = u16::try_from(self.len()).map_err(|_| CodecError::Overflow {
            what: "string length",
            value: self.len(),
        })?;
        let bytes = len.encode(w)?;
        w.write_all(self.as_bytes()).map_err(eof_as_truncated)?;
        Ok(bytes + self.len())
    }
}

impl Encodable for QId {
    fn encode<W: WriteBytesExt>(&self, w: &mut W) -> Result<usize> {
        (Encoder::new(w) << &self.typ.bits() << &self.version << &self.path)
            .into_result()
            .map(|enc| enc.bytes_written())
    }
}

impl Encodable for Value {
    fn encode<W: WriteBytesExt>(&self, w: &mut W) -> Result<usize> {
        match self {
            Value::Byte(v) => v.encode(w),
            Value::Word(v) => v.encode(w),
            Value::Long(v) => v.encode(w),
            Value::Quad(v) => v.encode(w),
            Value::Str(v) => v.encode(w),
            Value::QId(v) => v.encode(w),
        }
    }
}

/// Trait representing a type which can be deserialized from binary
pub trait Decodable: Sized {
    fn decode<R: ReadBytesExt>(r: &mut R) -> Result<Self>;
}

impl Decodable for u8 {
    fn decode<R: ReadBytesExt>(r: &mut R) -> Result<Self> {
        r.read_u8().map_err(eof_as_truncated)
    }
}

impl Decodable for u16 {
    fn decode<R: ReadBytesExt>(r: &mut R) -> Result<Self> {
        r.read_u16::<LittleEndian>().map_err(eof_as_truncated)
    }
}

impl Decodable for u32 {
    fn decode<R: ReadBytesExt>(r: &mut R) -> Result<Self> {
        r.read_u32::<LittleEndian>().map_err(eof_as_truncated)
    }
}

impl Decodable for u64 {
    fn decode<R: ReadBytesExt>(r: &mut R) -> Result<Self> {
        r.read_u64::<LittleEndian>().map_err(eof_as_truncated)
    }
}

impl Decodable for WireString {
    fn decode<R: ReadBytesExt>(r: &mut R) -> Result<Self> {
        let len: u16 = Decodable::decode(r)?;
        Ok(WireString(read_exact(r, len as usize)?))
    }
}

impl Decodable for QId {
    fn decode<R: ReadBytesExt>(r: &mut R) -> Result<Self> {
        Ok(QId {
            typ: QIdType::from_bits_retain(Decodable::decode(r)?),
            version: Decodable::decode(r)?,
            path: Decodable::decode(r)?,
        })
    }
}

impl FieldType {
    fn decode<R: ReadBytesExt>(self, r: &mut R) -> Result<Value> {
        Ok(match self {
            FieldType::Byte => Value::Byte(Decodable::decode(r)?),
            FieldType::Word => Value::Word(Decodable::decode(r)?),
            FieldType::Long => Value::Long(Decodable::decode(r)?),
            FieldType::Quad => Value::Quad(Decodable::decode(r)?),
            FieldType::Str => Value::Str(Decodable::decode(r)?),
            FieldType::QId => Value::QId(Decodable::decode(r)?),
        })
    }
}

/// Decode a frame body without its command byte according to `template`.
///
/// Bytes left over after the last field are ignored.
pub fn decode_fields(template: &str, payload: &[u8]) -> Result<Vec<Value>> {
    let mut r = payload;
    let mut values = Vec::with_capacity(template.len());
    for c in template.chars() {
        values.push(FieldType::try_from(c)?.decode(&mut r)?);
    }
    Ok(values)
}

/// Encode `values` into a frame body: the command byte followed by the
/// fields laid out by `template`.
pub fn encode_fields(typ: MsgType, template: &str, values: &[Value]) -> Result<Vec<u8>> {
    let fields = parse_template(template)?;
    if fields.len() != values.len() {
        return Err(CodecError::Arity {
            expected: fields.len(),
            found: values.len(),
        });
    }

    let mut enc = Encoder::new(Vec::new());
    enc.encode(&(typ as u8))?;
    for (field, value) in fields.into_iter().zip(values) {
        if value.field_type() != field {
            return Err(CodecError::Mismatch {
                expected: field,
                found: value.field_type(),
            });
        }
        enc.encode(value)?;
    }
    Ok(enc.into_inner())
}

/// Pulls typed values off a decoded field list in template order.
struct Fields(std::vec::IntoIter<Value>);

macro_rules! take {
    ($name:ident, $variant:ident, $typ:ty) => {
        fn $name(&mut self) -> Result<$typ> {
            match self.0.next() {
                Some(Value::$variant(v)) => Ok(v),
                Some(other) => Err(CodecError::Mismatch {
                    expected: FieldType::$variant,
                    found: other.field_type(),
                }),
                None => Err(CodecError::Truncated),
            }
        }
    };
}

impl Fields {
    take!(word, Word, u16);
    take!(long, Long, u32);
    take!(quad, Quad, u64);
    take!(string, Str, WireString);
    take!(qid, QId, QId);
}

impl Msg {
    /// Build a typed message out of the fields decoded for `typ`.
    ///
    /// The tag is always the first field.
    pub fn from_fields(typ: MsgType, values: Vec<Value>) -> Result<Msg> {
        let mut f = Fields(values.into_iter());
        let tag = f.word()?;

        let body = match typ {
            MsgType::RlError => FCall::RlError { ecode: f.long()? },
            MsgType::TGetAttr => FCall::TGetAttr {
                fid: f.long()?,
                req_mask: GetAttrMask::from_bits_retain(f.quad()?),
            },
            MsgType::RGetAttr => {
                let valid = GetAttrMask::from_bits_retain(f.quad()?);
                let qid = f.qid()?;
                let mut attrs = [0u64; GETATTR_RESERVED];
                for a in attrs.iter_mut() {
                    *a = f.quad()?;
                }
                FCall::RGetAttr { valid, qid, attrs }
            }
            MsgType::TVersion => FCall::TVersion {
                msize: f.long()?,
                version: f.string()?,
            },
            MsgType::RVersion => FCall::RVersion {
                msize: f.long()?,
                version: f.string()?,
            },
            MsgType::TAttach => FCall::TAttach {
                fid: f.long()?,
                afid: f.long()?,
                uname: f.string()?,
                aname: f.string()?,
                n_uname: f.long()?,
            },
            MsgType::RAttach => FCall::RAttach { qid: f.qid()? },
            MsgType::TClunk => FCall::TClunk { fid: f.long()? },
            MsgType::RClunk => FCall::RClunk,
        };

        Ok(Msg { tag, body })
    }

    /// Flatten the message into field values in template order, tag first.
    pub fn to_fields(&self) -> Vec<Value> {
        use crate::FCall::*;

        let mut v = vec![Value::Word(self.tag)];
        match self.body {
            RlError { ecode } => v.push(Value::Long(ecode)),
            TGetAttr { fid, req_mask } => {
                v.extend([Value::Long(fid), Value::Quad(req_mask.bits())]);
            }
            RGetAttr {
                valid,
                qid,
                ref attrs,
            } => {
                v.extend([Value::Quad(valid.bits()), Value::QId(qid)]);
                v.extend(attrs.iter().map(|a| Value::Quad(*a)));
            }
            TVersion { msize, ref version } | RVersion { msize, ref version } => {
                v.extend([Value::Long(msize), Value::Str(version.clone())]);
            }
            TAttach {
                fid,
                afid,
                ref uname,
                ref aname,
                n_uname,
            } => v.extend([
                Value::Long(fid),
                Value::Long(afid),
                Value::Str(uname.clone()),
                Value::Str(aname.clone()),
                Value::Long(n_uname),
            ]),
            RAttach { qid } => v.push(Value::QId(qid)),
            TClunk { fid } => v.push(Value::Long(fid)),
            RClunk => {}
        }
        v
    }
}
