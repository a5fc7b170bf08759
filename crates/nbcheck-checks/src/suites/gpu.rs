//! CUDA and PyTorch inside a container with every GPU passed through.

use crate::spec::{CheckSpec, Expectation};

const MATMUL: &str = r#"python -c '
import torch
x = torch.rand(100, 100).cuda()
y = torch.rand(100, 100).cuda()
z = torch.matmul(x, y)
assert z.is_cuda
print("GPU computation successful")
print(f"Device: {z.device}")
'"#;

const ALLOCATE: &str = r#"python -c '
import torch
tensor = torch.zeros(10, 10, 10).cuda()
memory_mb = torch.cuda.memory_allocated(0) / 1024**2
print(f"Memory allocated: {memory_mb:.2f} MB")
assert memory_mb > 0
'"#;

/// Checks of the `gpu` suite.
#[must_use]
pub fn checks() -> Vec<CheckSpec> {
    vec![
        CheckSpec::shell(
            "torch installed",
            "python -c 'import torch; print(torch.__version__)'",
        )
        .succeeds(),
        CheckSpec::shell(
            "cuda available",
            "python -c 'import torch; print(torch.cuda.is_available())'",
        )
        .succeeds()
        .expect(Expectation::contains("True")),
        CheckSpec::shell(
            "cuda device count",
            "python -c 'import torch; print(torch.cuda.device_count())'",
        )
        .succeeds()
        .expect(Expectation::StdoutAtLeast(1)),
        CheckSpec::shell("gpu computation", MATMUL)
            .succeeds()
            .expect(Expectation::contains("successful")),
        CheckSpec::shell(
            "cuda version",
            "python -c 'import torch; print(torch.version.cuda)'",
        )
        .succeeds(),
        CheckSpec::shell(
            "nvidia-smi",
            "nvidia-smi --query-gpu=name --format=csv,noheader",
        )
        .succeeds()
        .expect(Expectation::StdoutNotEmpty),
        CheckSpec::shell("gpu memory allocation", ALLOCATE).succeeds(),
    ]
}
