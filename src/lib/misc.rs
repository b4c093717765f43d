#[macro_export]
macro_rules! bail {
    ($e:expr) => {{
        return Err($e);
    }}
}

#[macro_export]
macro_rules! bailf {
    ($($e:expr),+) => {{
        return Err(format!($($e),+));
    }}
}
