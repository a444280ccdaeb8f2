//! # 唯一路径计算
//!
//! 先尝试 `folder/base.ext`，被占用时依次尝试 `base_1`、`base_2`…，
//! 直到 `exists` 判定为空闲。
//!
//! 探测与后续写入之间不是事务：若有其他写入方同时操作同一目录，
//! 仍可能撞名。这里假设批处理期间本进程是唯一写入方。

use super::join_path;

/// 计算目录内不冲突的目标路径。
///
/// # 示例
/// ```rust
/// use illuminator::vault::resolve_unique_path;
///
/// let taken = ["img/a.png", "img/a_1.png"];
/// let path = resolve_unique_path("img", "a", "png", |p| taken.contains(&p));
/// assert_eq!(path, "img/a_2.png");
/// ```
pub fn resolve_unique_path<F>(folder: &str, base_name: &str, ext: &str, exists: F) -> String
where
    F: Fn(&str) -> bool,
{
    let mut candidate = join_path(folder, &format!("{}.{}", base_name, ext));
    let mut counter: u64 = 1;

    while exists(&candidate) {
        candidate = join_path(folder, &format!("{}_{}.{}", base_name, counter, ext));
        counter += 1;
    }

    candidate
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn free_path_is_returned_unchanged() {
        let path = resolve_unique_path("attachments", "cat", "webp", |_| false);
        assert_eq!(path, "attachments/cat.webp");
    }

    #[test]
    fn collisions_append_incrementing_suffix() {
        let occupied: HashSet<&str> = ["a.png", "a_1.png"].into_iter().collect();
        let path = resolve_unique_path("", "a", "png", |p| occupied.contains(p));
        assert_eq!(path, "a_2.png");
    }

    #[test]
    fn suffix_probe_does_not_reuse_other_extensions() {
        let occupied: HashSet<&str> = ["img/a.png", "img/a_1.webp"].into_iter().collect();
        let path = resolve_unique_path("img", "a", "png", |p| occupied.contains(p));
        assert_eq!(path, "img/a_1.png");
    }
}
