pub mod archive_server;
pub mod archives;
