//! Shader source loading, template resolution and validation.
//!
//! Every program is a WGSL template with named insertion points written
//! `{{name}}`. Templates are resolved once, at start-up, against a
//! [`Fragments`] table:
//!
//! - `shader_params` - the [`ShaderParams`](crate::uniforms::ShaderParams)
//!   struct and the particle state codes
//! - `workgroup_size` - the compute workgroup width
//! - `bloom_common` - bloom bindings, the bloom parameter block and the
//!   screen-quad vertex stage
//!
//! A program that lacks an insertion point it depends on, names one that does
//! not exist, or leaves a marker open is rejected with a [`ShaderError`]. The
//! resolved text is parsed and validated with naga before any pipeline is
//! built from it.
//!
//! [`ShaderSources::prepare`] applies the degrade rules: the particle render
//! program is mandatory, the simulation kernel and the bloom programs are
//! dropped (with a warning) when they fail.

use std::collections::HashMap;
use std::path::Path;

use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

use crate::error::{ShaderError, ShaderProgram};
use crate::gpu::WORKGROUP_SIZE;

/// WGSL declaration of the per-frame parameter block and the state codes.
pub const SHADER_PARAMS_WGSL: &str = r#"
struct ShaderParams {
    model_view: mat4x4<f32>,
    model_view_projection: mat4x4<f32>,
    projection: mat4x4<f32>,
    attractor: vec4<f32>,
    num_particles: u32,
    sprite_size: f32,
    damping: f32,
    particle_scale: f32,
    noise_freq: f32,
    noise_strength: f32,
    particle_state: u32,
    state_time: f32,
    heart_scale: f32,
    state_duration: f32,
    _padding: vec2<f32>,
};

const STATE_NORMAL: u32 = 0u;
const STATE_ABSORBING: u32 = 1u;
const STATE_HEART: u32 = 2u;
const STATE_STAR: u32 = 3u;
"#;

/// WGSL shared by every bloom pass: bindings, parameters and the quad vertex stage.
pub const BLOOM_COMMON_WGSL: &str = r#"
struct BloomParams {
    texel_size: vec2<f32>,
    threshold: f32,
    intensity: f32,
};

@group(0) @binding(0) var primary_tex: texture_2d<f32>;
@group(0) @binding(1) var secondary_tex: texture_2d<f32>;
@group(0) @binding(2) var linear_sampler: sampler;
@group(0) @binding(3) var<uniform> bloom: BloomParams;

struct QuadOutput {
    @builtin(position) clip_position: vec4<f32>,
    @location(0) uv: vec2<f32>,
};

@vertex
fn vs_main(@location(0) position: vec2<f32>, @location(1) uv: vec2<f32>) -> QuadOutput {
    var out: QuadOutput;
    out.clip_position = vec4<f32>(position, 0.0, 1.0);
    out.uv = uv;
    return out;
}

fn luminance(c: vec3<f32>) -> f32 {
    return dot(c, vec3<f32>(0.2126, 0.7152, 0.0722));
}
"#;

const PARTICLE_WGSL: &str = include_str!("shaders/particle.wgsl");
const UPDATE_WGSL: &str = include_str!("shaders/update.wgsl");
const BLOOM_EXTRACT_WGSL: &str = include_str!("shaders/bloom_extract.wgsl");
const BLOOM_DOWNSAMPLE_WGSL: &str = include_str!("shaders/bloom_downsample.wgsl");
const BLOOM_UPSAMPLE_WGSL: &str = include_str!("shaders/bloom_upsample.wgsl");
const BLOOM_COMBINE_WGSL: &str = include_str!("shaders/bloom_combine.wgsl");

/// Insertion points `program` cannot work without.
pub fn required_insertions(program: ShaderProgram) -> &'static [&'static str] {
    match program {
        ShaderProgram::ParticleRender => &["shader_params"],
        ShaderProgram::SimulationKernel => &["shader_params", "workgroup_size"],
        ShaderProgram::BloomExtract
        | ShaderProgram::BloomDownsample
        | ShaderProgram::BloomUpsample
        | ShaderProgram::BloomCombine => &["bloom_common"],
    }
}

/// Named text blocks substituted into templates.
#[derive(Debug, Clone, Default)]
pub struct Fragments {
    entries: HashMap<&'static str, String>,
}

impl Fragments {
    /// The fragments every built-in program draws from.
    pub fn standard() -> Self {
        let mut fragments = Self::default();
        fragments.insert("shader_params", SHADER_PARAMS_WGSL);
        fragments.insert("workgroup_size", WORKGROUP_SIZE.to_string());
        fragments.insert("bloom_common", BLOOM_COMMON_WGSL);
        fragments
    }

    /// Add or replace a fragment.
    pub fn insert(&mut self, name: &'static str, text: impl Into<String>) {
        self.entries.insert(name, text.into());
    }

    /// Text of fragment `name`.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Segment<'a> {
    Text(&'a str),
    Insert(&'a str),
}

/// A parsed shader template.
#[derive(Debug, Clone)]
pub struct ShaderTemplate<'a> {
    program: ShaderProgram,
    segments: Vec<Segment<'a>>,
}

impl<'a> ShaderTemplate<'a> {
    /// Split `source` into literal text and insertion points.
    pub fn parse(program: ShaderProgram, source: &'a str) -> Result<Self, ShaderError> {
        let mut segments = Vec::new();
        let mut rest = source;
        let mut consumed = 0;

        while let Some(open) = rest.find("{{") {
            if open > 0 {
                segments.push(Segment::Text(&rest[..open]));
            }
            let after_open = &rest[open + 2..];
            let close = after_open.find("}}").ok_or(ShaderError::Unterminated {
                program,
                offset: consumed + open,
            })?;
            segments.push(Segment::Insert(after_open[..close].trim()));

            let advance = open + 2 + close + 2;
            consumed += advance;
            rest = &rest[advance..];
        }
        if !rest.is_empty() {
            segments.push(Segment::Text(rest));
        }

        Ok(Self { program, segments })
    }

    /// Program this template belongs to.
    pub fn program(&self) -> ShaderProgram {
        self.program
    }

    /// Insertion point names in order of appearance.
    pub fn insertion_points(&self) -> impl Iterator<Item = &'a str> + '_ {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Insert(name) => Some(*name),
            Segment::Text(_) => None,
        })
    }

    /// Fail unless every name in `names` appears at least once.
    pub fn require(&self, names: &[&str]) -> Result<(), ShaderError> {
        for name in names {
            if !self.insertion_points().any(|point| point == *name) {
                return Err(ShaderError::MissingInsertion {
                    program: self.program,
                    name: (*name).to_string(),
                });
            }
        }
        Ok(())
    }

    /// Substitute every insertion point from `fragments`.
    pub fn resolve(&self, fragments: &Fragments) -> Result<String, ShaderError> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Insert(name) => {
                    let text = fragments.get(name).ok_or_else(|| ShaderError::UnknownInsertion {
                        program: self.program,
                        name: (*name).to_string(),
                    })?;
                    out.push_str(text);
                }
            }
        }
        Ok(out)
    }
}

/// Parse and validate resolved WGSL, returning the naga module.
pub fn validate_wgsl(program: ShaderProgram, source: &str) -> Result<naga::Module, ShaderError> {
    let module = wgsl::parse_str(source).map_err(|err| ShaderError::Parse {
        program,
        message: err.emit_to_string(source),
    })?;

    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    validator
        .validate(&module)
        .map_err(|err| ShaderError::Validation {
            program,
            message: err.to_string(),
        })?;

    Ok(module)
}

/// Resolved WGSL for the four bloom programs.
#[derive(Debug, Clone)]
pub struct BloomSources {
    pub extract: String,
    pub downsample: String,
    pub upsample: String,
    pub combine: String,
}

/// Resolved programs after the degrade rules were applied.
#[derive(Debug, Clone)]
pub struct ShaderSet {
    /// Particle sprite program. Always present.
    pub render: String,
    /// Simulation kernel, `None` when it failed to prepare.
    pub kernel: Option<String>,
    /// Bloom programs, `None` when any of them failed to prepare.
    pub bloom: Option<BloomSources>,
}

/// Raw template text for each program.
#[derive(Debug, Clone, Default)]
pub struct ShaderSources {
    sources: HashMap<ShaderProgram, String>,
}

impl ShaderSources {
    /// The programs compiled into the binary.
    pub fn embedded() -> Self {
        let mut sources = Self::default();
        for program in ShaderProgram::ALL {
            let text = match program {
                ShaderProgram::ParticleRender => PARTICLE_WGSL,
                ShaderProgram::SimulationKernel => UPDATE_WGSL,
                ShaderProgram::BloomExtract => BLOOM_EXTRACT_WGSL,
                ShaderProgram::BloomDownsample => BLOOM_DOWNSAMPLE_WGSL,
                ShaderProgram::BloomUpsample => BLOOM_UPSAMPLE_WGSL,
                ShaderProgram::BloomCombine => BLOOM_COMBINE_WGSL,
            };
            sources.sources.insert(program, text.to_string());
        }
        sources
    }

    /// Read every program from `dir` by its file name. Unreadable files are
    /// logged and left absent.
    pub fn load_dir(dir: &Path) -> Self {
        let mut sources = Self::default();
        for program in ShaderProgram::ALL {
            let path = dir.join(program.file_name());
            match std::fs::read_to_string(&path) {
                Ok(text) => {
                    sources.sources.insert(program, text);
                }
                Err(err) => log::warn!("could not read {}: {}", path.display(), err),
            }
        }
        sources
    }

    /// Replace the text of one program.
    pub fn with_source(mut self, program: ShaderProgram, text: impl Into<String>) -> Self {
        self.sources.insert(program, text.into());
        self
    }

    /// Drop the text of one program.
    pub fn without(mut self, program: ShaderProgram) -> Self {
        self.sources.remove(&program);
        self
    }

    /// Template text of `program`, if any.
    pub fn get(&self, program: ShaderProgram) -> Option<&str> {
        self.sources.get(&program).map(String::as_str)
    }

    /// Resolve and validate one program.
    pub fn resolve(&self, program: ShaderProgram, fragments: &Fragments) -> Result<String, ShaderError> {
        let source = self.get(program).ok_or(ShaderError::Missing { program })?;
        let template = ShaderTemplate::parse(program, source)?;
        template.require(required_insertions(program))?;
        let resolved = template.resolve(fragments)?;
        validate_wgsl(program, &resolved)?;
        Ok(resolved)
    }

    /// Resolve every program. Only a render program failure is an error.
    pub fn prepare(&self, fragments: &Fragments) -> Result<ShaderSet, ShaderError> {
        let render = self.resolve(ShaderProgram::ParticleRender, fragments)?;

        let kernel = match self.resolve(ShaderProgram::SimulationKernel, fragments) {
            Ok(source) => Some(source),
            Err(err) => {
                log::warn!("simulation disabled: {}", err);
                None
            }
        };

        let bloom = match self.resolve_bloom(fragments) {
            Ok(sources) => Some(sources),
            Err(err) => {
                log::warn!("bloom disabled: {}", err);
                None
            }
        };

        Ok(ShaderSet {
            render,
            kernel,
            bloom,
        })
    }

    fn resolve_bloom(&self, fragments: &Fragments) -> Result<BloomSources, ShaderError> {
        Ok(BloomSources {
            extract: self.resolve(ShaderProgram::BloomExtract, fragments)?,
            downsample: self.resolve(ShaderProgram::BloomDownsample, fragments)?,
            upsample: self.resolve(ShaderProgram::BloomUpsample, fragments)?,
            combine: self.resolve(ShaderProgram::BloomCombine, fragments)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PROGRAM: ShaderProgram = ShaderProgram::BloomExtract;

    #[test]
    fn test_parse_splits_insertions() {
        let t = ShaderTemplate::parse(PROGRAM, "a {{ one }} b {{two}}").unwrap();
        let names: Vec<_> = t.insertion_points().collect();
        assert_eq!(names, vec!["one", "two"]);
    }

    #[test]
    fn test_unterminated_marker() {
        let err = ShaderTemplate::parse(PROGRAM, "fn f() {} {{bloom_common").unwrap_err();
        assert!(matches!(err, ShaderError::Unterminated { offset: 10, .. }));
    }

    #[test]
    fn test_missing_required_insertion() {
        let t = ShaderTemplate::parse(PROGRAM, "no markers here").unwrap();
        let err = t.require(&["bloom_common"]).unwrap_err();
        assert!(matches!(err, ShaderError::MissingInsertion { ref name, .. } if name == "bloom_common"));
    }

    #[test]
    fn test_unknown_insertion() {
        let t = ShaderTemplate::parse(PROGRAM, "{{nope}}").unwrap();
        let err = t.resolve(&Fragments::standard()).unwrap_err();
        assert!(matches!(err, ShaderError::UnknownInsertion { ref name, .. } if name == "nope"));
    }

    #[test]
    fn test_resolve_substitutes_text() {
        let mut fragments = Fragments::default();
        fragments.insert("x", "42");
        let t = ShaderTemplate::parse(PROGRAM, "a{{x}}b{{x}}").unwrap();
        assert_eq!(t.resolve(&fragments).unwrap(), "a42b42");
    }

    #[test]
    fn test_workgroup_fragment() {
        assert_eq!(Fragments::standard().get("workgroup_size"), Some("128"));
    }
}
