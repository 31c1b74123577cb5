use crate::error::Result;
use crate::net::platform::Platform;
use std::net::Ipv4Addr;

/// The port used for local address discovery.
///
/// No packet is sent to this port, it is only used to select a route.
const DISCOVERY_PORT: u16 = 80;

/// Discover a source address.
pub struct SourceAddr;

impl SourceAddr {
    /// Discover the local `Ipv4Addr` which routes to `target_addr`.
    pub fn discover<P: Platform>(target_addr: Ipv4Addr) -> Result<Ipv4Addr> {
        P::discover_local_addr(target_addr, DISCOVERY_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, IoError, IoOperation};
    use crate::net::platform::MockPlatform;
    use mockall::predicate;
    use std::io;
    use std::str::FromStr;
    use std::sync::Mutex;

    static MTX: Mutex<()> = Mutex::new(());

    #[test]
    fn test_discover_local_addr() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let expected_target = Ipv4Addr::from_str("1.2.3.4")?;
        let expected_src = Ipv4Addr::from_str("192.168.0.1")?;
        let ctx = MockPlatform::discover_local_addr_context();
        ctx.expect()
            .with(predicate::eq(expected_target), predicate::eq(DISCOVERY_PORT))
            .times(1)
            .returning(move |_, _| Ok(expected_src));
        let src_addr = SourceAddr::discover::<MockPlatform>(expected_target)?;
        assert_eq!(expected_src, src_addr);
        Ok(())
    }

    #[test]
    fn test_discover_local_addr_error() -> anyhow::Result<()> {
        let _m = MTX.lock();
        let ctx = MockPlatform::discover_local_addr_context();
        ctx.expect().times(1).returning(|_, _| {
            Err(Error::IoError(IoError::Other(
                io::Error::from(io::ErrorKind::Other),
                IoOperation::LocalAddr,
            )))
        });
        let res = SourceAddr::discover::<MockPlatform>(Ipv4Addr::from_str("1.2.3.4")?);
        assert!(matches!(res, Err(Error::IoError(_))));
        Ok(())
    }
}
