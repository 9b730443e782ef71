//! Static table of the commands this server answers.
//!
//! Each entry pairs a request code and its field template with the reply
//! code and the reply template. Templates use the alphabet of
//! [`serialize`](crate::serialize).

use crate::fcall::MsgType;
use num_traits::FromPrimitive;

/// One row of the command table
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Entry {
    pub request: MsgType,
    pub request_template: &'static str,
    pub response: MsgType,
    pub response_template: &'static str,
}

/// Template of `RlError`: tag[2] ecode[4]
pub const ERROR_TEMPLATE: &str = "WL";

const VERSION: Entry = Entry {
    request: MsgType::TVersion,
    request_template: "WLS",
    response: MsgType::RVersion,
    response_template: "WLS",
};

const ATTACH: Entry = Entry {
    request: MsgType::TAttach,
    request_template: "WLLSSL",
    response: MsgType::RAttach,
    response_template: "WI",
};

// tag[2] valid[8] qid[13] then 30 reserved attribute words
const GETATTR: Entry = Entry {
    request: MsgType::TGetAttr,
    request_template: "WLQ",
    response: MsgType::RGetAttr,
    response_template: concat!("WQI", "QQQQQQQQQQ", "QQQQQQQQQQ", "QQQQQQQQQQ"),
};

const CLUNK: Entry = Entry {
    request: MsgType::TClunk,
    request_template: "WL",
    response: MsgType::RClunk,
    response_template: "W",
};

/// Every supported request
pub static CATALOG: [Entry; 4] = [VERSION, ATTACH, GETATTR, CLUNK];

/// Get the entry serving requests of type `typ`.
pub fn entry(typ: MsgType) -> Option<&'static Entry> {
    use crate::MsgType::*;

    match typ {
        TVersion => Some(&CATALOG[0]),
        TAttach => Some(&CATALOG[1]),
        TGetAttr => Some(&CATALOG[2]),
        TClunk => Some(&CATALOG[3]),
        RlError | RGetAttr | RVersion | RAttach | RClunk => None,
    }
}

/// Resolve a raw command byte received from a client.
pub fn lookup(code: u8) -> Option<&'static Entry> {
    MsgType::from_u8(code).and_then(entry)
}

/// Get the template a reply of type `typ` is encoded with.
pub fn response_template(typ: MsgType) -> Option<&'static str> {
    if typ == MsgType::RlError {
        return Some(ERROR_TEMPLATE);
    }
    CATALOG
        .iter()
        .find(|e| e.response == typ)
        .map(|e| e.response_template)
}
