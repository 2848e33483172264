//! Test utilities: a hand-driven backend and a settable tick table.
