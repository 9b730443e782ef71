//! Asynchronous server side 9P library.
//!
//! # Protocol
//! 9P2000.L subset
//!
//! Every connection is served by one task owning its [`Session`]. Requests
//! are handled strictly in order: a frame is read, dispatched and answered
//! before the next one is read.

use {
    crate::{
        catalog,
        config::Config,
        error::{FrameError, ProtocolError, errno::EMSGSIZE, string as errstr},
        fcall::*,
        frame::FrameCodec,
        io_err,
        provider::ResourceProvider,
        res, serialize,
        session::Session,
        utils::{self, Result},
    },
    bytes::Bytes,
    futures::sink::SinkExt,
    log::{error, info, warn},
    std::{
        path::{Path, PathBuf},
        sync::{
            Arc,
            atomic::{AtomicBool, Ordering},
        },
    },
    tokio::{
        io::{AsyncRead, AsyncWrite},
        net::{TcpListener, UnixListener},
    },
    tokio_stream::StreamExt,
    tokio_util::codec::Framed,
};

#[rustfmt::skip]
async fn dispatch_once<P>(session: &mut Session, provider: &P, msg: &Msg) -> Result<FCall>
where
    P: ResourceProvider + ?Sized,
{
    use crate::FCall::*;

    match msg.body {
        TVersion { msize, ref version }                             => Ok(session.version(msize, version)),
        TAttach { fid, afid, ref uname, ref aname, n_uname }        => session.attach(provider, fid, afid, uname, aname, n_uname).await,
        TGetAttr { fid, req_mask }                                  => session.getattr(fid, req_mask),
        TClunk { fid }                                              => session.clunk(fid),
        ref other                                                   => res!(ProtocolError::UnknownCommand(MsgType::from(other) as u8)),
    }
}

/// Handle one frame body (command byte and payload) and return the body of
/// the reply.
///
/// Errors the client can recover from are turned into an `RlError` reply,
/// and so is a reply too large for the session's current msize. The errors
/// returned are fatal for the connection.
pub async fn handle_frame<P>(session: &mut Session, provider: &P, body: &[u8]) -> Result<Vec<u8>>
where
    P: ResourceProvider + ?Sized,
{
    let (&code, payload) = body.split_first().ok_or(FrameError::Truncated)?;
    let entry = catalog::lookup(code).ok_or(ProtocolError::UnknownCommand(code))?;

    let values = serialize::decode_fields(entry.request_template, payload)?;
    let msg = Msg::from_fields(entry.request, values)?;
    info!("\t← {:?}", msg);

    let body = match dispatch_once(session, provider, &msg).await {
        Ok(body) => body,
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            warn!(
                "{:?}: Error: \"{}\": {}",
                entry.request,
                e,
                errstr(e.errno())
            );
            FCall::RlError {
                ecode: e.errno() as u32,
            }
        }
    };

    let typ = MsgType::from(&body);
    debug_assert!(typ == entry.response || typ == MsgType::RlError);

    let out = encode_reply(msg.tag, body)?;
    // size[4] precedes the body on the wire
    let size = out.len() + 4;
    if size > session.msize() as usize {
        warn!(
            "{:?}: reply of {} bytes exceeds msize {}",
            entry.request,
            size,
            session.msize()
        );
        return encode_reply(msg.tag, FCall::RlError { ecode: EMSGSIZE as u32 });
    }

    Ok(out)
}

fn encode_reply(tag: u16, body: FCall) -> Result<Vec<u8>> {
    let response = Msg { tag, body };
    let typ = MsgType::from(&response.body);
    let template =
        catalog::response_template(typ).ok_or(ProtocolError::UnknownCommand(typ as u8))?;
    let out = serialize::encode_fields(typ, template, &response.to_fields())?;
    info!("\t→ {:?}", response);

    Ok(out)
}

/// Owner of one connection: the framed stream, its session and a handle on
/// the shared resource provider.
pub struct Dispatcher<T, P: ?Sized> {
    framed: Framed<T, FrameCodec>,
    session: Session,
    provider: Arc<P>,
}

impl<T, P> Dispatcher<T, P>
where
    T: AsyncRead + AsyncWrite + Unpin,
    P: ResourceProvider + ?Sized,
{
    pub fn new(io: T, provider: Arc<P>, config: &Config) -> Self {
        let session = Session::new(config);
        let framed = Framed::new(io, FrameCodec::new(session.msize()));

        Dispatcher {
            framed,
            session,
            provider,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Ceiling currently applied to frames in both directions
    pub fn max_frame_size(&self) -> u32 {
        self.framed.codec().max_frame_size()
    }

    /// Serve the next request.
    ///
    /// Returns `Ok(false)` when the client closed the stream between frames.
    pub async fn process_next(&mut self) -> Result<bool> {
        let body = match self.framed.next().await {
            Some(frame) => frame?,
            None => return Ok(false),
        };

        let reply = handle_frame(&mut self.session, &*self.provider, &body).await?;

        // A version exchange may have moved the ceiling
        self.framed
            .codec_mut()
            .set_max_frame_size(self.session.msize());
        self.framed.send(Bytes::from(reply)).await?;

        Ok(true)
    }

    /// Serve requests until the client disconnects or a fatal error occurs.
    pub async fn run(mut self) -> Result<()> {
        while self.process_next().await? {}
        Ok(())
    }
}

/// Serve one client connection to completion.
pub async fn dispatch<T, P>(io: T, provider: Arc<P>, config: &Config) -> Result<()>
where
    T: AsyncRead + AsyncWrite + Unpin,
    P: ResourceProvider + ?Sized,
{
    Dispatcher::new(io, provider, config).run().await
}

/// Accept TCP clients on `listener` forever, one task per connection.
pub async fn serve<P>(listener: TcpListener, provider: Arc<P>, config: Config) -> Result<()>
where
    P: 'static + ResourceProvider + ?Sized,
{
    loop {
        let (stream, peer) = listener.accept().await?;
        info!("accepted: {:?}", peer);

        let provider = provider.clone();
        tokio::spawn(async move {
            if let Err(e) = dispatch(stream, provider, &config).await {
                error!("{:?}: Error: {}: {:?}", peer, e, e);
            }
            info!("closed: {:?}", peer);
        });
    }
}

async fn srv_async_tcp<P>(provider: Arc<P>, config: Config, addr: &str) -> Result<()>
where
    P: 'static + ResourceProvider + ?Sized,
{
    let listener = TcpListener::bind(addr).await?;
    serve(listener, provider, config).await
}

struct DeleteOnDrop {
    path: PathBuf,
    listener: UnixListener,
}

impl DeleteOnDrop {
    fn bind(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref().to_owned();
        UnixListener::bind(&path).map(|listener| DeleteOnDrop { path, listener })
    }
}

impl std::ops::Deref for DeleteOnDrop {
    type Target = UnixListener;

    fn deref(&self) -> &Self::Target {
        &self.listener
    }
}

impl Drop for DeleteOnDrop {
    fn drop(&mut self) {
        // There's no way to return a useful error here
        if let Err(e) = std::fs::remove_file(&self.path) {
            warn!("Failed to remove socket file {:?}: {}", self.path, e);
        }
    }
}

/// Accept clients on a Unix domain socket until SIGINT or SIGTERM.
pub async fn srv_async_unix<P>(provider: Arc<P>, config: Config, addr: impl AsRef<Path>) -> Result<()>
where
    P: 'static + ResourceProvider + ?Sized,
{
    use tokio::signal::unix::{SignalKind, signal};

    let listener = DeleteOnDrop::bind(addr)?;

    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;

    let running = Arc::new(AtomicBool::new(true));

    {
        let running = running.clone();

        tokio::spawn(async move {
            tokio::select! {
                _ = sigterm.recv() => {
                    info!("Received SIGTERM, shutting down gracefully");
                }
                _ = sigint.recv() => {
                    info!("Received SIGINT, shutting down gracefully");
                }
            }
            running.store(false, Ordering::SeqCst);
        });
    }

    while running.load(Ordering::SeqCst) {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer) = result?;
                info!("accepted: {:?}", peer);

                let provider = provider.clone();
                tokio::spawn(async move {
                    if let Err(e) = dispatch(stream, provider, &config).await {
                        error!("Error: {}: {:?}", e, e);
                    }
                });
            }
            _ = tokio::time::sleep(std::time::Duration::from_millis(100)) => {
                // Allow the server to check the running flag
            }
        }
    }

    info!("Server shutdown complete");
    Ok(())
}

/// Serve on a `proto!addr!port` address, `proto` being `tcp` or `unix`.
pub async fn srv_async<P>(provider: Arc<P>, config: Config, addr: &str) -> Result<()>
where
    P: 'static + ResourceProvider + ?Sized,
{
    let (proto, host, port) = utils::parse_proto(addr)
        .ok_or_else(|| io_err!(InvalidInput, "Invalid protocol or address"))?;

    match proto {
        "tcp" => srv_async_tcp(provider, config, &format!("{}:{}", host, port)).await,
        "unix" => srv_async_unix(provider, config, host).await,
        _ => res!(io_err!(InvalidInput, "Protocol not supported")),
    }
}
