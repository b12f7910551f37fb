//! Version command

use crate::cli::VersionArgs;
use crate::version::VersionInfo;
use anyhow::Result;

pub fn run(args: VersionArgs) -> Result<()> {
    let info = VersionInfo::current();

    if args.json {
        println!("{}", serde_json::to_string_pretty(&info)?);
    } else {
        println!("{}", info.display());
        if let Some(date) = &info.build_date {
            println!("Build date: {}", date);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_info_display_names_binary() {
        let info = VersionInfo::current();
        assert!(!info.version.is_empty());
        assert!(info.display().starts_with("regsweep "));
    }

    #[test]
    fn test_version_json_output() {
        assert!(run(VersionArgs { json: true }).is_ok());
    }
}
