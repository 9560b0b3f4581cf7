//! The priming fill covers the whole addressable span, one write per page.

mod common;

use common::{MockDevice, DIR_WRITE};
use flashbench::driver::Driver;
use flashbench::protocol::DeviceLink;
use flashbench::{HarnessConfig, Session};

#[tokio::test]
async fn fill_issues_one_write_per_page_in_order() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("device.sock");
    let device = MockDevice::spawn(&socket, false, 0);

    let page = 4096u64;
    let pages = 16u64;
    let config = HarnessConfig {
        page_size: page,
        device_span: page * pages,
        ..Default::default()
    };

    let mut link = DeviceLink::connect(&socket, &config).await.unwrap();
    let session = Session::new(&config);
    let driver = Driver::new(config, session);

    driver.prime_device(&mut link).await.unwrap();

    let seen = device.seen.lock().clone();
    assert_eq!(seen.len(), pages as usize);
    for (i, request) in seen.iter().enumerate() {
        assert_eq!(request.direction, DIR_WRITE);
        assert_eq!(request.address, i as u64 * page);
        assert_eq!(request.size, page as u32);
    }

    device.shutdown();
}

#[tokio::test]
async fn skip_fill_issues_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let socket = dir.path().join("device.sock");
    let device = MockDevice::spawn(&socket, false, 0);

    let config = HarnessConfig {
        skip_fill: true,
        ..Default::default()
    };
    let mut link = DeviceLink::connect(&socket, &config).await.unwrap();
    let session = Session::new(&config);
    let driver = Driver::new(config, session);

    driver.prime_device(&mut link).await.unwrap();
    assert_eq!(device.request_count(), 0);

    device.shutdown();
}
