//! dockwright image build pipeline
//!
//! Resolves build-time variables (including the git revision), stages project
//! files into a build context, synthesizes a Dockerfile, and drives the image
//! engine through build, tag, push, archive and manifest recording.

pub mod auth;
pub mod context;
pub mod docker;
pub mod dockerfile;
pub mod engine;
pub mod error;
pub mod expand;
pub mod git;
pub mod image_name;
pub mod manifest;
pub mod orchestrator;
pub mod pattern;
pub mod progress;
pub mod retry;
pub mod revision;
pub mod stager;

pub use auth::RegistryAuth;
pub use docker::DockerEngine;
pub use dockerfile::{DOCKERFILE_NAME, synthesize, write_dockerfile};
pub use engine::{BuildEngine, BuildRequest, PushOutcome};
pub use error::{BuildError, BuildResult, EngineError, EngineResult, PipelineStep, RevisionError};
pub use expand::{expand, expansion_table};
pub use git::GitRepository;
pub use image_name::{ImageReference, parse_image_name, validate_tag};
pub use manifest::BuildManifest;
pub use orchestrator::{BuildOutcome, BuildPlan, BuildReport, Orchestrator, SkipReason};
pub use progress::EngineProgress;
pub use retry::{RetryExhausted, RetryPolicy};
pub use revision::{RepositoryHandle, RevisionInfo, RevisionResolver, RevisionSource};
pub use stager::{PathKind, StagedPath, StagedPaths, stage};
