pub mod behavioral;
pub mod fingerprint;
pub mod keys;
pub mod page;
pub mod stealth;
pub mod driver;
