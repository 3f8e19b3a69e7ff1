/// Status glyphs for human-mode output
pub struct Icons;

impl Icons {
    pub const CHECK: &str = "✅";
    pub const CROSS: &str = "❌";
    pub const INFO: &str = "ℹ️";
    pub const TABLE: &str = "📋";
    pub const NEW: &str = "✨";
    pub const DEL: &str = "🗑️";
}
