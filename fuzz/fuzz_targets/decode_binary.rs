#![no_main]

use chprep_core::format::decode_binary;
use chprep_core::validate_graph;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(graph) = decode_binary(data) {
        // Arcs outside every offset range keep weight 0; the rest are 1..=32.
        assert!(graph.weight.iter().all(|&w| w <= 32));
        assert_eq!(graph.weight.len(), graph.head.len());
        let _ = validate_graph(&graph);
    }
});
