//! SOCKS5 Protocol Constants

// SOCKS5 protocol version
pub const SOCKS5_VERSION: u8 = 0x05;

// Reserved field value
pub const SOCKS5_RESERVED: u8 = 0x00;

// SOCKS5 commands
pub const SOCKS5_CMD_CONNECT: u8 = 0x01;
pub const SOCKS5_CMD_BIND: u8 = 0x02;
pub const SOCKS5_CMD_UDP_ASSOCIATE: u8 = 0x03;

// Address types
pub const SOCKS5_ADDR_IPV4: u8 = 0x01;
pub const SOCKS5_ADDR_DOMAIN: u8 = 0x03;
pub const SOCKS5_ADDR_IPV6: u8 = 0x04;

// Authentication methods
pub const SOCKS5_AUTH_NONE: u8 = 0x00;
pub const SOCKS5_AUTH_USERPASS: u8 = 0x02;
pub const SOCKS5_AUTH_NO_ACCEPTABLE: u8 = 0xFF;

// Reply codes
pub const SOCKS5_REPLY_SUCCESS: u8 = 0x00;
pub const SOCKS5_REPLY_GENERAL_FAILURE: u8 = 0x01;
pub const SOCKS5_REPLY_CONNECTION_NOT_ALLOWED: u8 = 0x02;
pub const SOCKS5_REPLY_NETWORK_UNREACHABLE: u8 = 0x03;
pub const SOCKS5_REPLY_HOST_UNREACHABLE: u8 = 0x04;
pub const SOCKS5_REPLY_CONNECTION_REFUSED: u8 = 0x05;
pub const SOCKS5_REPLY_TTL_EXPIRED: u8 = 0x06;
pub const SOCKS5_REPLY_COMMAND_NOT_SUPPORTED: u8 = 0x07;
pub const SOCKS5_REPLY_ADDRESS_TYPE_NOT_SUPPORTED: u8 = 0x08;
// Sentinel used when a request fails and no better code is known
pub const SOCKS5_REPLY_FAILURE: u8 = 0xFF;

// Username/password sub-negotiation status codes.
// The sub-negotiation frames here open with SOCKS5_VERSION (0x05), not the
// 0x01 RFC 1929 specifies; peers of this implementation expect 0x05.
pub const SOCKS5_AUTH_STATUS_SUCCESS: u8 = 0x00;
pub const SOCKS5_AUTH_STATUS_FAILURE: u8 = 0xFF;
