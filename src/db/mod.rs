//! Database layer (hosted data API, with in-memory and offline modes).

pub mod memory;
pub mod supabase;

pub use memory::MemoryStore;
pub use supabase::SupabaseDb;

/// Table names as constants.
pub mod tables {
    pub const ESTABLISHMENTS: &str = "estabelecimentos";
    pub const BIRTHDAY_USERS: &str = "aniversariantes";
    pub const USER_ROLES: &str = "user_roles";
    pub const COUPONS: &str = "cupons";
}

/// Remote procedure that issues a coupon after server-side checks.
pub const EMIT_COUPON_RPC: &str = "emit_coupon_secure";
