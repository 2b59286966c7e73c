pub mod pledge;
