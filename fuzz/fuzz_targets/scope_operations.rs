#![no_main]

use contextual_di::{BindOptions, Container, DiError, ExecutionContext, Resolver};
use libfuzzer_sys::fuzz_target;

const NAMES: [&str; 4] = ["a", "b", "c", "d"];
const SCOPES: [&str; 3] = ["app", "request", "job"];

fuzz_target!(|data: &[u8]| {
    let container = Container::new();
    let mut contexts = vec![ExecutionContext::root().fork()];

    for chunk in data.chunks(2) {
        let op = chunk[0] % 7;
        let arg = chunk.get(1).copied().unwrap_or(0) as usize;
        let current = contexts[contexts.len() - 1].clone();

        current.run(|| match op {
            0 => {
                let child = ExecutionContext::current().fork();
                contexts.push(child);
            }
            1 => {
                if contexts.len() > 1 {
                    contexts.pop();
                }
            }
            2 => {
                container.set(NAMES[arg % NAMES.len()], arg);
            }
            3 => {
                let opts = BindOptions::default().in_scope(SCOPES[arg % SCOPES.len()]);
                container.bind_value(NAMES[arg % NAMES.len()], arg, opts);
            }
            4 => match container.alias_scope(SCOPES[arg % SCOPES.len()]) {
                Ok(_) | Err(DiError::ScopeCollision(_)) => {}
                Err(other) => panic!("unexpected alias error: {}", other),
            },
            5 => {
                let scope = (arg % 2 == 0).then(|| SCOPES[arg % SCOPES.len()]);
                let distance = container.distance(NAMES[arg % NAMES.len()]);
                match container.get_as::<usize>(NAMES[arg % NAMES.len()], scope) {
                    Ok(found) => {
                        if scope.is_none() && distance.is_none() {
                            assert!(found.is_none());
                        }
                    }
                    Err(DiError::Circular(_)) | Err(DiError::DepthExceeded(_)) => {}
                    Err(other) => panic!("unexpected resolution error: {}", other),
                }
            }
            _ => {
                container.bind_alias(
                    NAMES[arg % NAMES.len()],
                    NAMES[(arg / 4) % NAMES.len()],
                    BindOptions::default(),
                );
            }
        });
    }
});
