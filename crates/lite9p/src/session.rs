//! Per-connection protocol state.
//!
//! A [`Session`] holds the negotiated frame ceiling and the fid table of one
//! connection. It is owned by the task serving that connection and is never
//! shared.

use {
    crate::{
        config::Config,
        error::ProtocolError,
        fcall::*,
        provider::ResourceProvider,
        qid,
        utils::Result,
    },
    log::{debug, warn},
    std::collections::HashMap,
};

/// Negotiation phase of a session
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Phase {
    /// No version exchange yet; frames are bounded by the initial ceiling.
    Unversioned,
    /// At least one version exchange happened.
    Versioned,
}

#[derive(Clone, Debug)]
pub struct Session {
    /// Ceiling no negotiation may exceed
    ceiling: u32,
    /// Current maximum frame size
    msize: u32,
    phase: Phase,
    fids: HashMap<u32, QId>,
}

impl Session {
    pub fn new(config: &Config) -> Session {
        let ceiling = config.max_msize.clamp(MIN_MSIZE, MAX_MSIZE);
        Session {
            ceiling,
            msize: config.initial_msize.min(ceiling),
            phase: Phase::Unversioned,
            fids: HashMap::new(),
        }
    }

    /// Session with the default initial size and the given negotiation ceiling.
    pub fn with_ceiling(ceiling: u32) -> Session {
        Session::new(&Config {
            max_msize: ceiling,
            ..Config::default()
        })
    }

    pub fn msize(&self) -> u32 {
        self.msize
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Get the qid bound to `fid`
    pub fn fid(&self, fid: u32) -> Option<&QId> {
        self.fids.get(&fid)
    }

    pub fn fid_count(&self) -> usize {
        self.fids.len()
    }

    fn bound(&self, fid: u32) -> Result<QId> {
        self.fids
            .get(&fid)
            .copied()
            .ok_or_else(|| ProtocolError::UnknownHandle(fid).into())
    }

    /// Negotiate the frame ceiling and protocol version.
    ///
    /// The granted size never exceeds the session ceiling and never falls
    /// below [`MIN_MSIZE`], so every fixed size reply still fits.
    /// An unsupported version is answered with `VERSION_UNKNOWN`. Every fid
    /// is dropped in both cases.
    pub fn version(&mut self, msize: u32, version: &WireString) -> FCall {
        self.msize = self.ceiling.min(msize).max(MIN_MSIZE);
        self.phase = Phase::Versioned;
        self.fids.clear();

        let version = if *version == *P92000L {
            version.clone()
        } else {
            debug!("unsupported version {}", version);
            VERSION_UNKNOWN.into()
        };
        debug!("negotiated msize {} version {}", self.msize, version);

        FCall::RVersion {
            msize: self.msize,
            version,
        }
    }

    /// Bind `fid` to the resource called `aname`, replacing any previous
    /// binding.
    ///
    /// `afid` is ignored; there is no authentication. If the resource
    /// cannot be found the fid is left unbound.
    pub async fn attach<P>(
        &mut self,
        provider: &P,
        fid: u32,
        _afid: u32,
        uname: &WireString,
        aname: &WireString,
        _n_uname: u32,
    ) -> Result<FCall>
    where
        P: ResourceProvider + ?Sized,
    {
        if self.phase == Phase::Unversioned {
            warn!("attach of fid {} by {} before version negotiation", fid, uname);
        }

        match qid::make_qid(provider, aname).await {
            Ok(qid) => {
                self.fids.insert(fid, qid);
                Ok(FCall::RAttach { qid })
            }
            Err(e) => {
                self.fids.remove(&fid);
                Err(e)
            }
        }
    }

    /// Report the attributes of the resource bound to `fid`.
    ///
    /// Only the qid is real; the attribute words are reserved zeroes.
    pub fn getattr(&self, fid: u32, _req_mask: GetAttrMask) -> Result<FCall> {
        Ok(FCall::RGetAttr {
            valid: GetAttrMask::empty(),
            qid: self.bound(fid)?,
            attrs: [0; GETATTR_RESERVED],
        })
    }

    /// Release `fid`.
    pub fn clunk(&mut self, fid: u32) -> Result<FCall> {
        self.bound(fid)?;
        self.fids.remove(&fid);
        Ok(FCall::RClunk)
    }
}

impl Default for Session {
    fn default() -> Self {
        Session::new(&Config::default())
    }
}
