//! 检测框类型与 IoU 计算

/// 检测框几何信息
///
/// 坐标位于模型输入窗口的像素空间，`x`/`y` 为框中心，`width`/`height` 为宽高。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Dimensions {
    /// 中心x坐标
    pub x: f32,
    /// 中心y坐标
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

impl Dimensions {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self { x, y, width, height }
    }

    /// 按系数缩放所有分量
    pub fn scaled(&self, factor: f32) -> Self {
        Self {
            x: self.x * factor,
            y: self.y * factor,
            width: self.width * factor,
            height: self.height * factor,
        }
    }

    /// 转换为轴对齐矩形
    pub fn rect(&self) -> Rect {
        let half_w = self.width / 2.0;
        let half_h = self.height / 2.0;
        Rect {
            x1: self.x - half_w,
            y1: self.y - half_h,
            x2: self.x + half_w,
            y2: self.y + half_h,
        }
    }
}

/// 轴对齐矩形
///
/// 表示一个矩形边界框的左上角与右下角。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Rect {
    /// 左上角x坐标
    pub x1: f32,
    /// 左上角y坐标
    pub y1: f32,
    /// 右下角x坐标
    pub x2: f32,
    /// 右下角y坐标
    pub y2: f32,
}

impl Rect {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    pub fn width(&self) -> f32 {
        self.x2 - self.x1
    }

    pub fn height(&self) -> f32 {
        self.y2 - self.y1
    }

    /// 面积，宽或高为负时结果可能非正
    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    pub fn intersection(&self, other: &Rect) -> f32 {
        let x_left = self.x1.max(other.x1);
        let y_top = self.y1.max(other.y1);
        let x_right = self.x2.min(other.x2);
        let y_bottom = self.y2.min(other.y2);

        (x_right - x_left).max(0.0) * (y_bottom - y_top).max(0.0)
    }

    /// 计算两个矩形的交并比
    ///
    /// 任一矩形面积不为正时返回 0，避免除零。
    ///
    /// # 示例
    ///
    /// ```
    /// use tagsight::color::bounds::Rect;
    ///
    /// let a = Rect::new(0.0, 0.0, 10.0, 10.0);
    /// assert_eq!(a.iou(&a), 1.0);
    /// assert_eq!(a.iou(&Rect::new(20.0, 20.0, 30.0, 30.0)), 0.0);
    /// ```
    pub fn iou(&self, other: &Rect) -> f32 {
        let area_a = self.area();
        if area_a <= 0.0 {
            return 0.0;
        }
        let area_b = other.area();
        if area_b <= 0.0 {
            return 0.0;
        }

        let inter = self.intersection(other);
        inter / (area_a + area_b - inter)
    }
}

/// 解码阶段产生的候选框
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateBox {
    pub dimensions: Dimensions,
    /// 目标置信度（objectness 经过 sigmoid）
    pub confidence: f32,
    pub class_id: usize,
    pub label: String,
    /// 置信度与类别得分的乘积
    pub score: f32,
}

impl CandidateBox {
    pub fn rect(&self) -> Rect {
        self.dimensions.rect()
    }
}

/// 最终输出的检测框
///
/// 经过去重之后对外可见的记录，所有权随结果一起交给调用方。
#[derive(Debug, Clone, PartialEq)]
pub struct BoundingBox {
    pub dimensions: Dimensions,
    pub label: String,
    pub confidence: f32,
}

impl BoundingBox {
    pub fn rect(&self) -> Rect {
        self.dimensions.rect()
    }
}

impl From<&CandidateBox> for BoundingBox {
    fn from(candidate: &CandidateBox) -> Self {
        Self {
            dimensions: candidate.dimensions,
            label: candidate.label.clone(),
            confidence: candidate.confidence,
        }
    }
}

impl std::fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}:{:.3}, {:.1}:{:.1} - {:.1}:{:.1}",
            self.label,
            self.confidence,
            self.dimensions.x,
            self.dimensions.y,
            self.dimensions.width,
            self.dimensions.height
        )
    }
}
