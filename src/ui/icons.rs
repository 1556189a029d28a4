//! Shared UI icons.
//!
//! Each icon falls back to a bracketed ASCII marker on terminals without
//! emoji support.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK] ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR] ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "[WARN] ");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "* ");

// Session indicators
pub static BUILD: Emoji<'_, '_> = Emoji("🔨 ", "[BUILD] ");
pub static REVIEW: Emoji<'_, '_> = Emoji("🔍 ", "[QA] ");
pub static PROGRESS: Emoji<'_, '_> = Emoji("📊 ", "[PROG] ");
pub static STEER: Emoji<'_, '_> = Emoji("🧭 ", "[INPUT] ");

// File indicators
pub static FILE_NEW: Emoji<'_, '_> = Emoji("📄 ", "+");
pub static FILE_MOD: Emoji<'_, '_> = Emoji("📝 ", "~");
pub static FILE_DEL: Emoji<'_, '_> = Emoji("🗑️  ", "-");
