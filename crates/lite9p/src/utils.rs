use crate::error;

pub type Result<T> = ::std::result::Result<T, error::Error>;

#[macro_export]
macro_rules! io_err {
    ($kind:ident, $msg:expr) => {
        ::std::io::Error::new(::std::io::ErrorKind::$kind, $msg)
    };
}

#[macro_export]
macro_rules! res {
    ($err:expr) => {
        Err(From::from($err))
    };
}

/// Split a `proto!addr!port` listen address.
pub fn parse_proto(arg: &str) -> Option<(&str, &str, &str)> {
    let mut split = arg.split('!');
    let (proto, addr, port) = (split.next()?, split.next()?, split.next()?);

    Some((proto, addr, port))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn proto_address() {
        assert_eq!(
            parse_proto("tcp!0.0.0.0!1942"),
            Some(("tcp", "0.0.0.0", "1942"))
        );
        assert_eq!(
            parse_proto("unix!/tmp/lite9p!0"),
            Some(("unix", "/tmp/lite9p", "0"))
        );
        assert_eq!(parse_proto("tcp!localhost"), None);
    }
}
