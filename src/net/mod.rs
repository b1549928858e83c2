pub mod checksum;
pub mod ip;
pub mod tcp;
