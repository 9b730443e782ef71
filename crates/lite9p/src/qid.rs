//! Construction of qids from resource names.

use crate::{
    fcall::{QId, WireString},
    provider::ResourceProvider,
    utils::Result,
};

/// Get the qid of the resource called `name`.
///
/// The identity reported by `provider` becomes the qid path; type and
/// version are always 0. Lookup failures are returned unchanged.
pub async fn make_qid<P>(provider: &P, name: &WireString) -> Result<QId>
where
    P: ResourceProvider + ?Sized,
{
    Ok(QId::with_path(provider.identity_of(name).await?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{errno::ENOENT, fcall::QIdType, provider::MemoryProvider};

    #[tokio::test]
    async fn deterministic_qids() {
        let p = MemoryProvider::new(["root", "a"]);
        let q1 = make_qid(&p, &"root".into()).await.unwrap();
        let q2 = make_qid(&p, &"root".into()).await.unwrap();
        assert_eq!(q1, q2);
        assert_eq!(q1.typ, QIdType::FILE);
        assert_eq!(q1.version, 0);
        assert_ne!(q1.path, make_qid(&p, &"a".into()).await.unwrap().path);
    }

    #[tokio::test]
    async fn lookup_failure_propagates() {
        let p = MemoryProvider::default();
        let err = make_qid(&p, &"root".into()).await.unwrap_err();
        assert_eq!(err.errno(), ENOENT);
    }
}
