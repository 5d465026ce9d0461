use std::fmt::Write as _;
use std::path::Path;

/// One installed executable in a Pegasus text transformation catalog
#[derive(Debug, Clone)]
pub struct TransformationEntry {
    pub name: String,
    pub site: String,
    pub pfn: String,
    pub arch: String,
    pub os: String,
}

impl TransformationEntry {
    /// Entry for an executable installed on `site`, tagged with the host platform
    pub fn installed(name: &str, site: &str, executable: &Path) -> Self {
        let os = match std::env::consts::OS {
            "macos" => "MACOSX",
            "windows" => "WINDOWS",
            _ => "LINUX",
        };
        Self {
            name: name.to_string(),
            site: site.to_string(),
            pfn: format!("file://{}", executable.display()),
            arch: std::env::consts::ARCH.to_string(),
            os: os.to_string(),
        }
    }

    /// Render in the text catalog format
    pub fn to_catalog_text(&self) -> String {
        let mut s = String::new();
        let _ = writeln!(s, "tr {} {{", self.name);
        let _ = writeln!(s, "  site {} {{", self.site);
        let _ = writeln!(s, "    pfn \"{}\"", self.pfn);
        let _ = writeln!(s, "    arch \"{}\"", self.arch);
        let _ = writeln!(s, "    os \"{}\"", self.os);
        let _ = writeln!(s, "    type \"INSTALLED\"");
        let _ = writeln!(s, "  }}");
        let _ = writeln!(s, "}}");
        s
    }
}
