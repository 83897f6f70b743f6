pub mod assignment;
pub mod bill;
pub mod event;
pub mod legacy;
pub mod profile;
pub mod request;
pub mod support;
pub mod vendor;
