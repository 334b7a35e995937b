//! Report delivery to FTP and SFTP destinations.

mod ftp;
mod sftp;
mod transport;
mod uploader;

pub use ftp::FtpTransport;
pub use sftp::SftpTransport;
pub use transport::Transport;
pub use uploader::{DeliveryOutcome, DeliveryReport, Uploader};
