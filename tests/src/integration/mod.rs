//! End-to-end flows through the spawned engine.

#[cfg(test)]
mod support;

#[cfg(test)]
mod adaptive;
#[cfg(test)]
mod flows;
