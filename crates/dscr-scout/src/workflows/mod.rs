pub mod acquisition;
pub mod domain;
pub mod failure;
mod http;
pub mod notification;
pub mod pipeline;
pub mod qualification;
pub mod rent;
pub mod storage;
