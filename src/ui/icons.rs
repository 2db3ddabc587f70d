//! Shared UI icons.

use console::Emoji;

// Status indicators
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "[OK]");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "[ERR]");
pub static SPARKLE: Emoji<'_, '_> = Emoji("✨ ", "*");
pub static SKIPPED: Emoji<'_, '_> = Emoji("⏭️  ", "[-]");

// Run indicators
pub static RUNNING: Emoji<'_, '_> = Emoji("▶️  ", "[>]");
pub static CLOCK: Emoji<'_, '_> = Emoji("⏱️  ", "[T]");
pub static MICROPHONE: Emoji<'_, '_> = Emoji("🎙️  ", "[A]");
pub static TEXT: Emoji<'_, '_> = Emoji("📝 ", "[T]");
