//! ABI MCP
//!
//! Turns a smart-contract ABI (from a file, Etherscan or Sourcify) into a
//! runnable Model Context Protocol (MCP) server: every function becomes a tool,
//! every event a resource. The runtime that generated servers link against
//! lives here too: typed call encoding, gas pricing, pre-flight simulation,
//! signing and submission.

pub mod abi;
pub mod config;
pub mod error;
pub mod fetch;
pub mod generator;
pub mod manifest;
pub mod mapper;
pub mod networks;
pub mod pipeline;
pub mod runtime;
pub mod server;

pub use error::{Error, Result};
pub use server::ContractMcpHandler;
