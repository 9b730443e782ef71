use std::sync::Arc;

use bytes::Bytes;
use futures::sink::SinkExt;
use lite9p::{
    GETATTR_RESERVED, GetAttrMask, MAX_MSIZE, MsgType, NOFID, NONUNAME, NOTAG, P92000L, catalog,
    config::Config,
    errno::EBADF,
    frame::FrameCodec,
    provider::DirProvider,
    serialize::{self, Value},
    srv,
};
use tokio::net::{TcpListener, TcpStream};
use tokio_stream::StreamExt;
use tokio_util::codec::Framed;

async fn request(
    client: &mut Framed<TcpStream, FrameCodec>,
    typ: MsgType,
    values: Vec<Value>,
) -> Vec<Value> {
    let entry = catalog::entry(typ).unwrap();
    let body = serialize::encode_fields(typ, entry.request_template, &values).unwrap();
    client.send(Bytes::from(body)).await.unwrap();

    let reply = client.next().await.unwrap().unwrap();
    let template = if reply[0] == entry.response as u8 {
        entry.response_template
    } else {
        assert_eq!(reply[0], MsgType::RlError as u8);
        catalog::ERROR_TEMPLATE
    };
    serialize::decode_fields(template, &reply[1..]).unwrap()
}

#[tokio::test]
async fn export_directory_over_tcp() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::create_dir(dir.path().join("sub")).unwrap();

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let provider = Arc::new(DirProvider::new(dir.path()));
    tokio::spawn(srv::serve(listener, provider, Config::default()));

    let mut client = Framed::new(
        TcpStream::connect(addr).await.unwrap(),
        FrameCodec::new(MAX_MSIZE),
    );

    let r = request(
        &mut client,
        MsgType::TVersion,
        vec![
            Value::Word(NOTAG),
            Value::Long(1 << 20),
            Value::Str(P92000L.into()),
        ],
    )
    .await;
    assert_eq!(r[1], Value::Long(MAX_MSIZE));
    assert_eq!(r[2], Value::Str(P92000L.into()));

    let attach = |fid: u32, aname: &str| {
        vec![
            Value::Word(1),
            Value::Long(fid),
            Value::Long(NOFID),
            Value::Str("nobody".into()),
            Value::Str(aname.into()),
            Value::Long(NONUNAME),
        ]
    };

    let root = request(&mut client, MsgType::TAttach, attach(1, "/")).await;
    let sub = request(&mut client, MsgType::TAttach, attach(2, "sub")).await;
    assert_ne!(root[1], sub[1]);

    let again = request(&mut client, MsgType::TAttach, attach(3, "/sub/")).await;
    assert_eq!(sub[1], again[1]);

    let attrs = request(
        &mut client,
        MsgType::TGetAttr,
        vec![Value::Word(2), Value::Long(2), Value::Quad(GetAttrMask::ALL.bits())],
    )
    .await;
    assert_eq!(attrs[2], sub[1]);
    assert_eq!(attrs.len(), 3 + GETATTR_RESERVED);

    let clunk = request(&mut client, MsgType::TClunk, vec![Value::Word(3), Value::Long(2)]).await;
    assert_eq!(clunk, vec![Value::Word(3)]);

    let err = request(&mut client, MsgType::TClunk, vec![Value::Word(4), Value::Long(2)]).await;
    assert_eq!(err, vec![Value::Word(4), Value::Long(EBADF as u32)]);
}
