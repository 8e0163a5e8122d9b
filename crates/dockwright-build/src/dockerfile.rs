//! Dockerfile の生成
//!
//! 命令の順序は固定:
//! FROM, MAINTAINER, ENV, WORKDIR, ADD, RUN, HEALTHCHECK, EXPOSE, USER,
//! ENTRYPOINT, CMD, VOLUME, LABEL。値が無い命令は出力しない。

use crate::stager::{PathKind, StagedPath, StagedPaths};
use dockwright_core::DockerfileRecipe;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

/// ビルドコンテキスト内の Dockerfile 名
pub const DOCKERFILE_NAME: &str = "Dockerfile";

/// RUN をまとめるときの区切り
const RUN_SEPARATOR: &str = " &&\\\n\t";

/// Dockerfile のテキストを生成する（副作用なし）
pub fn synthesize(recipe: &DockerfileRecipe, staged: &StagedPaths) -> String {
    let mut lines: Vec<String> = Vec::new();

    if let Some(base) = &recipe.base_image {
        lines.push(format!("FROM {}", base));
    }
    if let Some(maintainer) = &recipe.maintainer {
        lines.push(format!("MAINTAINER {}", maintainer));
    }
    for (key, value) in &recipe.env {
        lines.push(format!("ENV {} {}", key, value));
    }
    if let Some(workdir) = &recipe.workdir {
        lines.push(format!("WORKDIR {}", workdir));
    }
    for path in staged {
        // `$` は Docker に変数として解釈されるのでエスケープする
        lines.push(format!(
            "ADD {} {}",
            path.path.replace('$', "\\$"),
            add_destination(path)
        ));
    }
    if !recipe.runs.is_empty() {
        if recipe.squash_runs {
            lines.push(format!("RUN {}", recipe.runs.join(RUN_SEPARATOR)));
        } else {
            lines.extend(recipe.runs.iter().map(|run| format!("RUN {}", run)));
        }
    }
    if let Some(healthcheck) = &recipe.healthcheck {
        let mut line = String::from("HEALTHCHECK ");
        if let Some(options) = &healthcheck.options {
            line.push_str(options);
            line.push(' ');
        }
        line.push_str("CMD ");
        line.push_str(&healthcheck.cmd);
        lines.push(line);
    }
    if !recipe.exposes.is_empty() {
        let ports: Vec<&str> = recipe.exposes.iter().map(String::as_str).collect();
        lines.push(format!("EXPOSE {}", ports.join(" ")));
    }
    if let Some(user) = &recipe.user {
        lines.push(format!("USER {}", user));
    }
    if let Some(entrypoint) = &recipe.entrypoint {
        lines.push(format!("ENTRYPOINT {}", entrypoint));
    }
    if let Some(cmd) = &recipe.cmd {
        lines.push(cmd_instruction(cmd, recipe.entrypoint.is_some()));
    }
    lines.extend(recipe.volumes.iter().map(|v| format!("VOLUME {}", v)));
    lines.extend(recipe.labels.iter().map(|l| format!("LABEL {}", l)));

    if lines.is_empty() {
        return String::new();
    }
    let mut dockerfile = lines.join("\n");
    dockerfile.push('\n');
    dockerfile
}

/// ADD のコピー先
///
/// ファイルなら親ディレクトリ（末尾 `/`、トップレベルなら `.`）、
/// ディレクトリならそのパス。
fn add_destination(path: &StagedPath) -> String {
    match path.kind {
        PathKind::File => match path.path.rsplit_once('/') {
            Some((parent, _)) => format!("{}/", parent),
            None => ".".to_string(),
        },
        PathKind::Directory => path.path.clone(),
    }
}

/// ENTRYPOINT がある場合、CMD は引数リスト形式でなければならない
fn cmd_instruction(cmd: &str, has_entrypoint: bool) -> String {
    let trimmed = cmd.trim();
    if !has_entrypoint || (trimmed.starts_with('[') && trimmed.ends_with(']')) {
        return format!("CMD {}", cmd);
    }

    let args: Vec<String> = trimmed
        .split_whitespace()
        .map(|arg| format!("\"{}\"", arg.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    let instruction = format!("CMD [{}]", args.join(", "));
    tracing::warn!(
        "Entrypoint provided but cmd is not an explicit list. \
         Generated an argument list: {}",
        instruction
    );
    instruction
}

/// Dockerfile をコンテキストルートに書き出す（既存ファイルは上書き）
pub fn write_dockerfile(context_dir: &Path, content: &str) -> io::Result<PathBuf> {
    fs::create_dir_all(context_dir)?;
    let path = context_dir.join(DOCKERFILE_NAME);
    tracing::debug!("Writing Dockerfile:\n{}", content);
    fs::write(&path, content)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dockwright_core::Healthcheck;

    fn alpine() -> DockerfileRecipe {
        DockerfileRecipe {
            base_image: Some("alpine".to_string()),
            ..Default::default()
        }
    }

    fn files(paths: &[&str]) -> StagedPaths {
        let mut staged = StagedPaths::new();
        for p in paths {
            staged.push(*p, PathKind::File);
        }
        staged
    }

    #[test]
    fn test_minimal_dockerfile() {
        let dockerfile = synthesize(&alpine(), &files(&["app.jar"]));
        assert_eq!(dockerfile, "FROM alpine\nADD app.jar .\n");
    }

    #[test]
    fn test_synthesize_is_pure() {
        let mut recipe = alpine();
        recipe.env.insert("B".to_string(), "2".to_string());
        recipe.env.insert("A".to_string(), "1".to_string());
        let staged = files(&["libs/a.jar", "libs/b.jar"]);

        assert_eq!(synthesize(&recipe, &staged), synthesize(&recipe, &staged));
    }

    #[test]
    fn test_full_instruction_order() {
        let mut recipe = alpine();
        recipe.maintainer = Some("ops@example.com".to_string());
        recipe.env.insert("TZ".to_string(), "UTC".to_string());
        recipe.env.insert("JAVA_OPTS".to_string(), "-Xmx1g".to_string());
        recipe.workdir = Some("/app".to_string());
        recipe.runs = vec!["apk add curl".to_string(), "adduser -D app".to_string()];
        recipe.healthcheck = Some(Healthcheck {
            options: Some("--interval=30s".to_string()),
            cmd: "curl -f http://localhost/".to_string(),
        });
        recipe.exposes.insert("9090".to_string());
        recipe.exposes.insert("8080".to_string());
        recipe.exposes.insert("8080".to_string());
        recipe.user = Some("app".to_string());
        recipe.entrypoint = Some("[\"java\", \"-jar\"]".to_string());
        recipe.cmd = Some("[\"app.jar\"]".to_string());
        recipe.volumes = vec!["/data".to_string()];
        recipe.labels = vec!["team=shop".to_string()];

        let mut staged = files(&["libs/app.jar"]);
        staged.push("conf", PathKind::Directory);

        let expected = "\
FROM alpine
MAINTAINER ops@example.com
ENV JAVA_OPTS -Xmx1g
ENV TZ UTC
WORKDIR /app
ADD libs/app.jar libs/
ADD conf conf
RUN apk add curl
RUN adduser -D app
HEALTHCHECK --interval=30s CMD curl -f http://localhost/
EXPOSE 8080 9090
USER app
ENTRYPOINT [\"java\", \"-jar\"]
CMD [\"app.jar\"]
VOLUME /data
LABEL team=shop
";
        assert_eq!(synthesize(&recipe, &staged), expected);
    }

    #[test]
    fn test_squashed_runs() {
        let mut recipe = alpine();
        recipe.runs = vec!["apk update".to_string(), "apk add curl".to_string()];
        recipe.squash_runs = true;

        let dockerfile = synthesize(&recipe, &StagedPaths::new());
        assert_eq!(dockerfile, "FROM alpine\nRUN apk update &&\\\n\tapk add curl\n");
    }

    #[test]
    fn test_dollar_is_escaped_in_add() {
        let dockerfile = synthesize(&alpine(), &files(&["lib/Outer$Inner.class"]));
        assert!(dockerfile.contains("ADD lib/Outer\\$Inner.class lib/\n"));
    }

    #[test]
    fn test_cmd_converted_to_list_with_entrypoint() {
        let mut recipe = alpine();
        recipe.entrypoint = Some("/docker-entrypoint.sh".to_string());
        recipe.cmd = Some("serve  --port 8080".to_string());

        let dockerfile = synthesize(&recipe, &StagedPaths::new());
        assert!(dockerfile.contains("CMD [\"serve\", \"--port\", \"8080\"]\n"));
    }

    #[test]
    fn test_cmd_verbatim_without_entrypoint() {
        let mut recipe = alpine();
        recipe.cmd = Some("java -jar app.jar".to_string());

        let dockerfile = synthesize(&recipe, &StagedPaths::new());
        assert!(dockerfile.ends_with("CMD java -jar app.jar\n"));
    }

    #[test]
    fn test_healthcheck_without_options() {
        let mut recipe = alpine();
        recipe.healthcheck = Some(Healthcheck {
            options: None,
            cmd: "true".to_string(),
        });

        let dockerfile = synthesize(&recipe, &StagedPaths::new());
        assert!(dockerfile.contains("HEALTHCHECK CMD true\n"));
    }

    #[test]
    fn test_write_dockerfile_overwrites() {
        let temp = tempfile::tempdir().unwrap();
        let context = temp.path().join("build/docker");
        write_dockerfile(&context, "FROM old\n").unwrap();
        let path = write_dockerfile(&context, "FROM alpine\n").unwrap();

        assert_eq!(path, context.join("Dockerfile"));
        assert_eq!(fs::read_to_string(path).unwrap(), "FROM alpine\n");
    }
}
