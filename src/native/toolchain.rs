use std::path::{Path, PathBuf};

use crate::{config::RunnerConfig, core::domain::Language};

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StagedFile {
    /// Relative to the workspace root.
    pub path: PathBuf,
    pub contents: String,
}

/// How to stage and launch one language.
///
/// Supporting a new language means adding an entry to [`TOOLCHAINS`].
#[derive(Debug)]
pub struct Toolchain {
    pub language: Language,
    pub executable: fn(&RunnerConfig) -> &Path,
    pub args: &'static [&'static str],
    pub stage: fn(&str) -> Vec<StagedFile>,
}

pub static TOOLCHAINS: &[Toolchain] = &[
    Toolchain {
        language: Language::Python,
        executable: python_path,
        args: &["solution.py"],
        stage: stage_python,
    },
    Toolchain {
        language: Language::CSharp,
        executable: dotnet_path,
        args: &["run", "--project", "Solution"],
        stage: stage_csharp,
    },
];

pub fn toolchain(language: Language) -> Option<&'static Toolchain> {
    TOOLCHAINS.iter().find(|t| t.language == language)
}

const CSPROJ: &str = r#"<Project Sdk="Microsoft.NET.Sdk">
  <PropertyGroup>
    <OutputType>Exe</OutputType>
    <TargetFramework>net8.0</TargetFramework>
    <Nullable>enable</Nullable>
  </PropertyGroup>
</Project>
"#;

fn python_path(config: &RunnerConfig) -> &Path {
    &config.python_path
}

fn dotnet_path(config: &RunnerConfig) -> &Path {
    &config.dotnet_path
}

fn stage_python(source: &str) -> Vec<StagedFile> {
    vec![StagedFile {
        path: "solution.py".into(),
        contents: source.to_string(),
    }]
}

fn stage_csharp(source: &str) -> Vec<StagedFile> {
    vec![
        StagedFile {
            path: Path::new("Solution").join("Solution.csproj"),
            contents: CSPROJ.to_string(),
        },
        StagedFile {
            path: Path::new("Solution").join("Program.cs"),
            contents: source.to_string(),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_language_has_toolchain() {
        for language in [Language::Python, Language::CSharp] {
            let toolchain = toolchain(language).unwrap();
            assert_eq!(toolchain.language, language);
        }
    }

    #[test]
    fn test_python_staging() {
        let toolchain = toolchain(Language::Python).unwrap();
        let files = (toolchain.stage)("print('hi')");

        assert_eq!(
            files,
            vec![StagedFile {
                path: "solution.py".into(),
                contents: "print('hi')".to_string(),
            }]
        );
        assert_eq!(toolchain.args, &["solution.py"]);
    }

    #[test]
    fn test_csharp_staging_has_project_file() {
        let toolchain = toolchain(Language::CSharp).unwrap();
        let files = (toolchain.stage)("Console.WriteLine(1);");

        assert_eq!(files.len(), 2);
        assert_eq!(files[0].path, Path::new("Solution/Solution.csproj"));
        assert!(files[0].contents.contains("<OutputType>Exe</OutputType>"));
        assert_eq!(files[1].path, Path::new("Solution/Program.cs"));
        assert_eq!(files[1].contents, "Console.WriteLine(1);");
        assert_eq!(toolchain.args, &["run", "--project", "Solution"]);
    }

    #[test]
    fn test_executables_follow_config() {
        let config = RunnerConfig {
            python_path: "/opt/py/bin/python3".into(),
            ..Default::default()
        };

        let python = toolchain(Language::Python).unwrap();
        let csharp = toolchain(Language::CSharp).unwrap();
        assert_eq!((python.executable)(&config), Path::new("/opt/py/bin/python3"));
        assert_eq!((csharp.executable)(&config), Path::new("dotnet"));
    }
}
