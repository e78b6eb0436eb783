#[cfg(test)]
mod scan;
