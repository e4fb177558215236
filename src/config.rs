//! 配置模块，负责过滤函数注册表和解析限制, 可从JSON配置文件加载

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use crate::error::{CqlError, Result};

/// 过滤函数名到参数个数的映射
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FunctionRegistry {
    arities: BTreeMap<String, usize>,
}

impl FunctionRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self {
            arities: BTreeMap::new(),
        }
    }

    pub fn register(&mut self, name: &str, arity: usize) -> &mut Self {
        self.arities.insert(name.to_string(), arity);
        self
    }

    /// 获取函数的参数个数，未注册的函数返回 None
    pub fn arity(&self, name: &str) -> Option<usize> {
        self.arities.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.arities.keys().map(String::as_str)
    }
}

impl Default for FunctionRegistry {
    /// 内置函数: `proximity(property, distance, terms)` 和 `pi()`
    fn default() -> Self {
        let mut registry = Self::new();
        registry.register("proximity", 3).register("pi", 0);
        registry
    }
}

/// 读取 CQL 时使用的配置
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderConfig {
    /// 已知的过滤函数
    pub functions: FunctionRegistry,
    /// 括号嵌套深度上限, None 表示不限制
    pub max_depth: Option<usize>,
}

impl ReaderConfig {
    /// 从JSON文件加载配置
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();

        // 检查文件是否存在
        if !path_ref.exists() {
            return Err(CqlError::Config(format!(
                "配置文件不存在: {}",
                path_ref.display()
            )));
        }

        // 读取文件内容
        let content = fs::read_to_string(path_ref).map_err(|e| {
            CqlError::Config(format!("无法读取配置文件 {}: {}", path_ref.display(), e))
        })?;

        let config = Self::from_json_str(&content).map_err(|e| {
            CqlError::Config(format!("{} ({})", e, path_ref.display()))
        })?;
        tracing::debug!(
            path = %path_ref.display(),
            functions = config.functions.arities.len(),
            max_depth = ?config.max_depth,
            "loaded reader config"
        );
        Ok(config)
    }

    /// 解析JSON配置, 缺省字段使用默认值
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content)
            .map_err(|e| CqlError::Config(format!("无法解析JSON配置: {}", e)))
    }
}
