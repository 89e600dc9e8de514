//! HL7定界符与字符转义
//!
//! 自由文本（所见、人名、科室等）中出现的定界符必须先转义再写入字段，
//! 否则一条含竖线的所见就能破坏整条消息的段结构。

/// HL7消息定界符集合
///
/// 构建一次后只读共享给组装器，不存在可变的模块级状态。
#[derive(Debug, Clone)]
pub struct Hl7Encoding {
    pub field_separator: char,
    pub component_separator: char,
    pub repetition_separator: char,
    pub escape_character: char,
    pub subcomponent_separator: char,
}

impl Default for Hl7Encoding {
    fn default() -> Self {
        Self {
            field_separator: '|',
            component_separator: '^',
            repetition_separator: '~',
            escape_character: '\\',
            subcomponent_separator: '&',
        }
    }
}

impl Hl7Encoding {
    pub fn new() -> Self {
        Self::default()
    }

    /// MSH-2 编码字符字面量
    pub fn encoding_characters(&self) -> String {
        format!(
            "{}{}{}{}",
            self.component_separator,
            self.repetition_separator,
            self.escape_character,
            self.subcomponent_separator
        )
    }

    /// 转义字段值中的定界符
    ///
    /// 单遍扫描，转义序列里引入的反斜杠不会被二次转义。
    pub fn escape(&self, value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\E\\"),
                '|' => escaped.push_str("\\F\\"),
                '^' => escaped.push_str("\\S\\"),
                '~' => escaped.push_str("\\R\\"),
                '&' => escaped.push_str("\\T\\"),
                _ => escaped.push(c),
            }
        }
        escaped
    }
}
