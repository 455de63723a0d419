// imgflow/src/pipeline/validate.rs

//! Load-time validation of a stage graph. Produces the index-resolved arena the engine walks.

use crate::core::stage::{EdgeKind, StageDefinition, StageKind};
use crate::error::GraphConfigError;
use std::collections::{HashMap, VecDeque};
use tracing::{event, Level};

/// A validated stage with its edges resolved to arena indices.
#[derive(Debug, Clone)]
pub(crate) struct Node {
  pub(crate) def: StageDefinition,
  pub(crate) next: Option<usize>,
  pub(crate) catch: Option<usize>,
}

#[derive(Debug)]
pub(crate) struct ResolvedGraph {
  pub(crate) nodes: Vec<Node>,
  pub(crate) index: HashMap<String, usize>,
  pub(crate) start: usize,
  pub(crate) failure_handler: usize,
}

pub(crate) fn resolve(start: &str, stages: Vec<StageDefinition>) -> Result<ResolvedGraph, GraphConfigError> {
  if stages.is_empty() {
    return Err(GraphConfigError::Empty);
  }

  let mut index = HashMap::with_capacity(stages.len());
  for (idx, stage) in stages.iter().enumerate() {
    if index.insert(stage.name.clone(), idx).is_some() {
      return Err(GraphConfigError::DuplicateStage(stage.name.clone()));
    }
  }

  let start_idx = *index
    .get(start)
    .ok_or_else(|| GraphConfigError::MissingStart(start.to_string()))?;
  if stages[start_idx].kind == StageKind::Fail {
    return Err(GraphConfigError::StartIsTerminal(start.to_string()));
  }

  let mut nodes = Vec::with_capacity(stages.len());
  for stage in &stages {
    if stage.kind == StageKind::Fail {
      if stage.adapter.is_some() || stage.next.is_some() || stage.catch.is_some() {
        return Err(GraphConfigError::InvalidFailTerminal(stage.name.clone()));
      }
    } else if stage.adapter.as_deref().map_or(true, str::is_empty) {
      return Err(GraphConfigError::MissingAdapter(stage.name.clone()));
    }
    let next = resolve_edge(&index, stage, EdgeKind::Success)?;
    let catch = resolve_edge(&index, stage, EdgeKind::Error)?;
    nodes.push(Node {
      def: stage.clone(),
      next,
      catch,
    });
  }

  let failure_handler = find_failure_handler(&nodes)?;
  check_roles(&nodes, failure_handler)?;
  check_acyclic(&nodes)?;
  check_reachable(&nodes, start_idx)?;

  event!(
    Level::DEBUG,
    stages = nodes.len(),
    start = %nodes[start_idx].def.name,
    failure_handler = %nodes[failure_handler].def.name,
    "Pipeline graph validated."
  );

  Ok(ResolvedGraph {
    nodes,
    index,
    start: start_idx,
    failure_handler,
  })
}

fn resolve_edge(
  index: &HashMap<String, usize>,
  stage: &StageDefinition,
  edge: EdgeKind,
) -> Result<Option<usize>, GraphConfigError> {
  match stage.edge(edge) {
    None => Ok(None),
    Some(target) => index
      .get(target)
      .copied()
      .map(Some)
      .ok_or_else(|| GraphConfigError::DanglingEdge {
        stage: stage.name.clone(),
        edge,
        target: target.to_string(),
      }),
  }
}

fn find_failure_handler(nodes: &[Node]) -> Result<usize, GraphConfigError> {
  let mut found: Option<usize> = None;
  for (idx, node) in nodes.iter().enumerate() {
    if node.def.kind != StageKind::FailureHandler {
      continue;
    }
    if let Some(first) = found {
      return Err(GraphConfigError::DuplicateFailureHandler {
        first: nodes[first].def.name.clone(),
        second: node.def.name.clone(),
      });
    }
    found = Some(idx);
  }
  found.ok_or(GraphConfigError::MissingFailureHandler)
}

fn targets_fail_terminal(nodes: &[Node], target: Option<usize>) -> bool {
  target.map_or(false, |t| nodes[t].def.kind == StageKind::Fail)
}

fn check_roles(nodes: &[Node], failure_handler: usize) -> Result<(), GraphConfigError> {
  for node in nodes {
    let name = &node.def.name;
    match node.def.kind {
      StageKind::Work => {
        match node.catch {
          None => return Err(GraphConfigError::MissingErrorEdge(name.clone())),
          Some(target) if target != failure_handler => {
            return Err(GraphConfigError::MisroutedErrorEdge {
              stage: name.clone(),
              target: nodes[target].def.name.clone(),
              handler: nodes[failure_handler].def.name.clone(),
            })
          }
          Some(_) => {}
        }
        if node.next.is_none() {
          return Err(GraphConfigError::MissingSuccessEdge(name.clone()));
        }
      }
      // The success notification is the only success terminal.
      StageKind::Notify => {
        if node.next.is_some() {
          return Err(GraphConfigError::NotificationContinues(name.clone()));
        }
        if node.catch.is_some() && !targets_fail_terminal(nodes, node.catch) {
          return Err(GraphConfigError::ExpectedFailTerminal {
            stage: name.clone(),
            edge: EdgeKind::Error,
          });
        }
      }
      StageKind::FailureHandler => {
        if !targets_fail_terminal(nodes, node.next) {
          return Err(GraphConfigError::ExpectedFailTerminal {
            stage: name.clone(),
            edge: EdgeKind::Success,
          });
        }
        if node.catch.is_some() && !targets_fail_terminal(nodes, node.catch) {
          return Err(GraphConfigError::ExpectedFailTerminal {
            stage: name.clone(),
            edge: EdgeKind::Error,
          });
        }
      }
      StageKind::Fail => {}
    }
  }
  Ok(())
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
  Unvisited,
  InProgress,
  Done,
}

/// Iterative depth-first search over both edge sets. Reports the first back edge as a cycle path.
fn check_acyclic(nodes: &[Node]) -> Result<(), GraphConfigError> {
  let mut marks = vec![Mark::Unvisited; nodes.len()];

  for root in 0..nodes.len() {
    if marks[root] != Mark::Unvisited {
      continue;
    }
    // (node, number of successors already explored)
    let mut stack: Vec<(usize, usize)> = vec![(root, 0)];
    marks[root] = Mark::InProgress;

    while let Some(top) = stack.last_mut() {
      let node = top.0;
      let successors = [nodes[node].next, nodes[node].catch];
      let pending = successors[top.1..].iter().position(Option::is_some);
      match pending {
        Some(offset) => {
          let slot = top.1 + offset;
          top.1 = slot + 1;
          let succ = successors[slot].unwrap_or(node);
          match marks[succ] {
            Mark::InProgress => {
              let from = stack.iter().position(|(n, _)| *n == succ).unwrap_or(0);
              let mut path: Vec<String> = stack[from..].iter().map(|(n, _)| nodes[*n].def.name.clone()).collect();
              path.push(nodes[succ].def.name.clone());
              return Err(GraphConfigError::Cycle(path));
            }
            Mark::Unvisited => {
              marks[succ] = Mark::InProgress;
              stack.push((succ, 0));
            }
            Mark::Done => {}
          }
        }
        None => {
          marks[node] = Mark::Done;
          stack.pop();
        }
      }
    }
  }
  Ok(())
}

fn check_reachable(nodes: &[Node], start: usize) -> Result<(), GraphConfigError> {
  let mut seen = vec![false; nodes.len()];
  let mut queue = VecDeque::from([start]);
  seen[start] = true;
  while let Some(node) = queue.pop_front() {
    for succ in [nodes[node].next, nodes[node].catch].into_iter().flatten() {
      if !seen[succ] {
        seen[succ] = true;
        queue.push_back(succ);
      }
    }
  }
  match seen.iter().position(|reached| !reached) {
    Some(idx) => Err(GraphConfigError::Unreachable(nodes[idx].def.name.clone())),
    None => Ok(()),
  }
}
