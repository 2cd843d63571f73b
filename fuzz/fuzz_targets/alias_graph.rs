#![no_main]

use contextual_di::{BindOptions, Container, ContainerConfig, DiError};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if data.len() < 2 {
        return;
    }

    let container = Container::with_config(ContainerConfig {
        max_resolution_depth: 32,
        ..ContainerConfig::default()
    });

    // Each pair of bytes is an edge; a self edge on an even node binds a value
    for edge in data.chunks_exact(2) {
        let from = format!("n{}", edge[0] % 16);
        let to = format!("n{}", edge[1] % 16);
        if edge[0] % 16 == edge[1] % 16 && edge[0] % 2 == 0 {
            container.set(from, edge[0]);
        } else {
            container.bind_alias(from, to, BindOptions::default());
        }
    }

    for node in 0..16 {
        match container.get(format!("n{}", node), None) {
            Ok(_) => {}
            Err(DiError::Circular(path)) => {
                assert!(path.len() >= 2);
                assert_eq!(path.first(), path.last());
            }
            Err(DiError::DepthExceeded(depth)) => assert_eq!(depth, 32),
            Err(other) => panic!("unexpected error: {}", other),
        }
    }
});
