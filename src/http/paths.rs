//! Per-stage path exemptions.

/// Paths that never carry tenant identity.
const PUBLIC_PATHS: &[&str] = &[
    "/",
    "/health",
    "/docs",
    "/redoc",
    "/openapi.json",
    "/api/v1/auth/register",
    "/api/v1/auth/login",
];

/// Prefixes that never carry tenant identity.
const PUBLIC_PREFIXES: &[&str] = &["/api/v1/subscriptions/webhook"];

const UNLIMITED_PATHS: &[&str] = &["/", "/health", "/docs", "/redoc", "/openapi.json"];

const UNAUDITED_PATHS: &[&str] = &["/health", "/docs", "/redoc", "/openapi.json"];

/// Tenant resolution is skipped entirely for these paths.
pub fn skips_resolution(path: &str) -> bool {
    PUBLIC_PATHS.contains(&path) || PUBLIC_PREFIXES.iter().any(|p| path.starts_with(p))
}

pub fn skips_rate_limit(path: &str) -> bool {
    UNLIMITED_PATHS.contains(&path)
}

pub fn skips_audit(path: &str) -> bool {
    UNAUDITED_PATHS.contains(&path)
}
