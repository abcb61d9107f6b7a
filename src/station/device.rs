/// Raw HID access to the weather station console
use log::info;
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncReadExt, AsyncWriteExt};

/// USB identity of the HID based consoles from Oregon Scientific.
pub const VENDOR_ID: u16 = 0x0fde;
pub const PRODUCT_ID: u16 = 0xca01;

/// Command that switches the console into continuous reporting mode. Sent
/// once before reads begin.
pub const INIT_COMMAND: [u8; 8] = [0x20, 0x00, 0x08, 0x01, 0x00, 0x00, 0x00, 0x00];

/// A report is at most one count byte plus 19 payload bytes.
pub const REPORT_CAPACITY: usize = 20;

/// The console's hidraw character device.
pub struct HidConsole {
    file: File,
}

impl HidConsole {
    /// Open the hidraw node. Failing here is fatal: without a console there
    /// is nothing to decode.
    pub async fn open(path: &str) -> std::io::Result<Self> {
        let file = OpenOptions::new().read(true).write(true).open(path).await?;
        Ok(HidConsole { file })
    }

    /// Initialization sequence for HID based weather stations from Oregon
    /// Scientific.
    pub async fn send_init(&mut self) -> std::io::Result<()> {
        info!("Device found. Initializing");
        self.file.write_all(&INIT_COMMAND).await?;
        self.file.flush().await
    }

    /// Read the next raw report. Returns the number of bytes delivered,
    /// 0 at end of stream.
    pub async fn read_report(&mut self, buf: &mut [u8; REPORT_CAPACITY]) -> std::io::Result<usize> {
        self.file.read(buf).await
    }
}
