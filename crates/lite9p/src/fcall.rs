//! 9P message types and constants.
//!
//! # Protocol
//! 9P2000.L subset: version, attach, getattr and clunk.

use std::fmt;

use bitflags::bitflags;
use enum_primitive::*;

/// 9P2000.L version string, the only version this server speaks
pub const P92000L: &str = "9P2000.L";

/// The version string that comes with RVersion when the server does not understand
/// the client's version string
pub const VERSION_UNKNOWN: &str = "unknown";

/*
 * 9P magic numbers
 */
/// Special tag which `TVersion`/`RVersion` must use as `tag`
pub const NOTAG: u16 = !0;

/// Special value which `TAttach` with no auth must use as `afid`
pub const NOFID: u32 = !0;

/// Special uid which `TAttach` uses as `n_uname` to indicate no uid is specified
pub const NONUNAME: u32 = !0;

/// Absolute ceiling of a frame, whatever the client proposes
pub const MAX_MSIZE: u32 = 65536;

/// Frame ceiling applied before any version exchange
pub const DEFAULT_MSIZE: u32 = 200;

/// Smallest size a version exchange grants: the largest fixed size reply,
/// `RGetAttr`, must fit.
///
/// size[4] type[1] tag[2] valid[8] qid[13] attrs[30 * 8]
pub const MIN_MSIZE: u32 = (4 + 1 + 2 + 8 + QId::SIZE + 8 * GETATTR_RESERVED) as u32;

/// size[4] type[1]
pub const MIN_FRAME_SIZE: u32 = 5;

/// Number of reserved attribute words following the qid in `RGetAttr`
pub const GETATTR_RESERVED: usize = 30;

bitflags! {
    /// Bits in QId.typ
    ///
    /// # Protocol
    /// 9P2000/9P2000.L
    #[derive(Copy, Debug, Default, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct QIdType: u8 {
        #[doc = "Plain file"]
        const FILE      = 0x00;
    }
}

bitflags! {
    /// Bits in `mask` and `valid` of `TGetAttr` and `RGetAttr`.
    ///
    /// # Protocol
    /// 9P2000.L
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub struct GetAttrMask: u64 {
        const MODE          = 0x00000001;
        const NLINK         = 0x00000002;
        const UID           = 0x00000004;
        const GID           = 0x00000008;
        const RDEV          = 0x00000010;
        const ATIME         = 0x00000020;
        const MTIME         = 0x00000040;
        const CTIME         = 0x00000080;
        const INO           = 0x00000100;
        const SIZE          = 0x00000200;
        const BLOCKS        = 0x00000400;

        const BTIME         = 0x00000800;
        const GEN           = 0x00001000;
        const DATA_VERSION  = 0x00002000;

        #[doc = "Mask for fields up to BLOCKS"]
        const BASIC         = 0x000007ff;
        #[doc = "Mask for All fields above"]
        const ALL           = 0x00003fff;
    }
}

/// Server side data type for path tracking
///
/// The server's unique identification for the resource being accessed
///
/// # Protocol
/// 9P2000/9P2000.L
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct QId {
    /// Resource category; always empty here
    pub typ: QIdType,
    /// Reserved, always 0
    pub version: u32,
    /// Stable identity of the resource for the lifetime of the server
    pub path: u64,
}

impl QId {
    /// Encoded size: type[1] version[4] path[8]
    pub const SIZE: usize = 13;

    pub fn with_path(path: u64) -> QId {
        QId {
            typ: QIdType::FILE,
            version: 0,
            path,
        }
    }
}

/// String as carried on the wire: raw bytes, not validated as UTF-8.
#[derive(Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct WireString(pub Vec<u8>);

impl WireString {
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<&str> for WireString {
    fn from(s: &str) -> Self {
        WireString(s.as_bytes().to_vec())
    }
}

impl From<Vec<u8>> for WireString {
    fn from(v: Vec<u8>) -> Self {
        WireString(v)
    }
}

impl PartialEq<str> for WireString {
    fn eq(&self, other: &str) -> bool {
        self.0 == other.as_bytes()
    }
}

impl fmt::Display for WireString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", String::from_utf8_lossy(&self.0))
    }
}

impl fmt::Debug for WireString {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", String::from_utf8_lossy(&self.0))
    }
}

enum_from_primitive! {
    #[doc = "Message type, 9P operations"]
    #[derive(Copy, Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
    pub enum MsgType {
        // 9P2000.L
        RlError         = 7,
        TGetAttr        = 24,
        RGetAttr        = 26,

        // 9P2000
        TVersion        = 100,
        RVersion,
        TAttach         = 104,
        RAttach,
        TClunk          = 120,
        RClunk,
    }
}

impl MsgType {
    /// If the message type is T-message
    pub fn is_t(&self) -> bool {
        !self.is_r()
    }

    /// If the message type is R-message
    pub fn is_r(&self) -> bool {
        use crate::MsgType::*;

        matches!(*self, RlError | RGetAttr | RVersion | RAttach | RClunk)
    }
}

impl<'a> From<&'a FCall> for MsgType {
    fn from(fcall: &'a FCall) -> MsgType {
        match *fcall {
            FCall::RlError { .. } => MsgType::RlError,
            FCall::TGetAttr { .. } => MsgType::TGetAttr,
            FCall::RGetAttr { .. } => MsgType::RGetAttr,
            FCall::TVersion { .. } => MsgType::TVersion,
            FCall::RVersion { .. } => MsgType::RVersion,
            FCall::TAttach { .. } => MsgType::TAttach,
            FCall::RAttach { .. } => MsgType::RAttach,
            FCall::TClunk { .. } => MsgType::TClunk,
            FCall::RClunk => MsgType::RClunk,
        }
    }
}

/// A data type encapsulating the supported 9P messages
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum FCall {
    // 9P2000.L
    RlError {
        ecode: u32,
    },
    TGetAttr {
        fid: u32,
        req_mask: GetAttrMask,
    },
    /// Attribute words are placeholders; the backing provider only supplies identities.
    RGetAttr {
        valid: GetAttrMask,
        qid: QId,
        attrs: [u64; GETATTR_RESERVED],
    },

    // 9P2000
    TVersion {
        msize: u32,
        version: WireString,
    },
    RVersion {
        msize: u32,
        version: WireString,
    },
    TAttach {
        fid: u32,
        afid: u32,
        uname: WireString,
        aname: WireString,
        n_uname: u32,
    },
    RAttach {
        qid: QId,
    },
    TClunk {
        fid: u32,
    },
    RClunk,
}

impl FCall {
    /// Get the qid which self contains, if any
    pub fn qid(&self) -> Option<QId> {
        match *self {
            FCall::RGetAttr { qid, .. } => Some(qid),
            FCall::RAttach { qid } => Some(qid),
            _ => None,
        }
    }
}

/// Envelope for 9P messages
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct Msg {
    /// Chosen and used by the client to identify the message.
    /// The reply to the message will have the same tag
    pub tag: u16,
    /// Message body encapsulating the various 9P messages
    pub body: FCall,
}
