//! Dependency resolution over a box graph.
//!
//! A box must not compile before every box that writes a variable it reads
//! has compiled. The data-flow edges are implied by shared variable names:
//! an output port of one box bound to the same variable as an input port of
//! another orders the writer first. Variables with no writer box are
//! pipeline inputs, resolved up-front in the table.

use crucible_boxes::PipelineBox;
use petgraph::algo::toposort;
use petgraph::graph::DiGraph;
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("cycle detected in box data flow")]
    CycleDetected,
    #[error("empty pipeline")]
    EmptyPipeline,
}

/// Reorder boxes into a valid compilation sequence: every box compiles
/// after all writers of the variables it reads. Boxes with no data-flow
/// relation may come out in any order.
pub fn sort_boxes(
    boxes: Vec<Box<dyn PipelineBox>>,
) -> Result<Vec<Box<dyn PipelineBox>>, GraphError> {
    if boxes.is_empty() {
        return Err(GraphError::EmptyPipeline);
    }

    let mut graph = DiGraph::<usize, ()>::new();
    let indices: Vec<_> = (0..boxes.len()).map(|i| graph.add_node(i)).collect();

    // variable name -> boxes writing it
    let mut writers: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, bx) in boxes.iter().enumerate() {
        for port in bx.base().output_ports() {
            if let Some(binding) = port.binding() {
                writers.entry(binding).or_default().push(i);
            }
        }
    }

    for (i, bx) in boxes.iter().enumerate() {
        for port in bx.base().input_ports() {
            let Some(binding) = port.binding() else {
                continue;
            };
            for &writer in writers.get(binding).into_iter().flatten() {
                if writer != i {
                    graph.add_edge(indices[writer], indices[i], ());
                }
            }
        }
    }

    let order = toposort(&graph, None).map_err(|_| GraphError::CycleDetected)?;

    let mut slots: Vec<Option<Box<dyn PipelineBox>>> = boxes.into_iter().map(Some).collect();
    let mut sorted = Vec::with_capacity(slots.len());
    for node in order {
        let i = graph[node];
        if let Some(bx) = slots[i].take() {
            sorted.push(bx);
        }
    }
    Ok(sorted)
}
