//! Validates every WGSL program with naga before wgpu ever sees it.

use naga::front::wgsl;
use naga::valid::{Capabilities, ValidationFlags, Validator};

use spinbubble::shader::KernelParams;
use spinbubble::{Kernel, KernelSources};

fn validate(source: &str, stage: &str) -> naga::Module {
    let module = match wgsl::parse_str(source) {
        Ok(module) => module,
        Err(err) => panic!("{} failed to parse:\n{}", stage, err.emit_to_string(source)),
    };
    let mut validator = Validator::new(ValidationFlags::all(), Capabilities::all());
    if let Err(err) = validator.validate(&module) {
        panic!("{} failed validation: {:?}", stage, err);
    }
    module
}

#[test]
fn test_compute_kernels_validate() {
    let sources = KernelSources::default();
    for kernel in [Kernel::RampUp, Kernel::Propose, Kernel::Bond, Kernel::Accept] {
        let module = validate(&sources.compose(kernel), kernel.label());
        assert!(
            module
                .entry_points
                .iter()
                .any(|ep| ep.name == "main" && ep.stage == naga::ShaderStage::Compute),
            "{} has no compute entry point",
            kernel.label()
        );
    }
}

#[test]
fn test_compute_kernels_use_256_wide_workgroups() {
    let sources = KernelSources::default();
    for kernel in [Kernel::RampUp, Kernel::Propose, Kernel::Bond, Kernel::Accept] {
        let module = validate(&sources.compose(kernel), kernel.label());
        assert_eq!(module.entry_points[0].workgroup_size, [256, 1, 1]);
    }
}

#[test]
fn test_render_shader_validates() {
    let sources = KernelSources::default();
    let module = validate(sources.render(), "render");
    let stages: Vec<naga::ShaderStage> = module.entry_points.iter().map(|ep| ep.stage).collect();
    assert!(stages.contains(&naga::ShaderStage::Vertex));
    assert!(stages.contains(&naga::ShaderStage::Fragment));
}

#[test]
fn test_params_block_matches_host_layout() {
    let sources = KernelSources::default();
    let module = validate(&sources.compose(Kernel::Propose), "propose");
    let params = module
        .types
        .iter()
        .find(|(_, ty)| ty.name.as_deref() == Some("Params"))
        .map(|(_, ty)| ty.inner.clone())
        .expect("Params struct");
    match params {
        naga::TypeInner::Struct { span, .. } => {
            assert_eq!(span as usize, std::mem::size_of::<KernelParams>())
        }
        other => panic!("unexpected Params type {:?}", other),
    }
}
