#![no_main]

use chprep_core::format::parse_adjacency;
use chprep_core::validate_graph;
use libfuzzer_sys::fuzz_target;

// Any text either fails to parse or yields a graph the validator can judge
// without panicking.
fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data)
        && let Ok(graph) = parse_adjacency(text)
    {
        let _ = validate_graph(&graph);
    }
});
