//! Fixed word lists for the university domain.
//!
//! Every entry is lowercase NFC so it can be compared against normalized text directly.

/// Abbreviation → expansion. Matched on whole words, longest key first.
pub const ABBREVIATIONS: &[(&str, &str)] = &[
    // university
    ("fpt", "fpt university"),
    ("fptu", "fpt university"),
    ("fpt edu", "fpt university"),
    // academic
    ("cntt", "công nghệ thông tin"),
    ("it", "information technology"),
    ("ai", "artificial intelligence"),
    ("ml", "machine learning"),
    ("dl", "deep learning"),
    ("ds", "data science"),
    ("cs", "computer science"),
    ("se", "software engineering"),
    ("ce", "computer engineering"),
    ("cyber", "cybersecurity"),
    ("attt", "an toàn thông tin"),
    // business
    ("qtkd", "quản trị kinh doanh"),
    ("ql", "quản lý"),
    ("kt", "kinh tế"),
    ("tài chính", "finance"),
    ("marketing", "digital marketing"),
    ("dm", "digital marketing"),
    // languages
    ("nn", "ngoại ngữ"),
    ("english", "tiếng anh"),
    ("ielts", "international english language testing system"),
    ("toeic", "test of english for international communication"),
    // academic terms
    ("ojt", "on the job training"),
    ("gpa", "grade point average"),
    ("credit", "tín chỉ"),
    ("semester", "học kỳ"),
    ("academic", "học thuật"),
    // campuses
    ("hanoi", "hà nội"),
    ("hcm", "thành phố hồ chí minh"),
    ("danang", "đà nẵng"),
    ("cantho", "cần thơ"),
    ("hoalac", "hòa lạc"),
    ("quy nhon", "quy nhơn"),
];

pub const STOP_WORDS: &[&str] = &[
    // vietnamese
    "và", "của", "có", "là", "được", "một", "này", "đó", "cho", "với", "từ", "tại", "về", "như",
    "khi", "nếu", "để", "sẽ", "đã", "đang", "các", "những", "nhiều", "ít", "rất", "quá", "cũng",
    "chỉ", "còn", "thì", "mà", "nên", "vì", "do", "bởi", "ở", "trong", "ngoài", "trên", "dưới",
    "trước", "sau", "giữa", "bên", "cạnh", "gần", "xa",
    // english
    "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by", "is",
    "are", "was", "were", "be", "been", "have", "has", "had", "do", "does", "did", "will",
    "would", "could", "should", "can", "may", "might", "must", "shall", "this", "that", "these",
    "those", "what", "when", "where", "why", "how", "which", "who", "whom", "whose",
];

/// Vocabulary that marks a query as belonging to the university domain.
pub const DOMAIN_KEYWORDS: &[&str] = &[
    "fpt", "university", "đại học", "trường", "campus", "sinh viên", "student", "giảng viên",
    "lecturer", "professor", "khoa", "faculty", "ngành", "major", "chuyên ngành",
    "specialization", "môn học", "course", "subject", "học kỳ", "semester", "năm học",
    "academic year", "tín chỉ", "credit",
];

/// Off-topic families; a hit marks the query irrelevant unless domain context is present.
pub const IRRELEVANT_PATTERNS: &[&str] = &[
    "thời tiết|weather|mưa|nắng|lạnh|nóng|temperature|forecast",
    "nấu ăn|cooking|món ăn|recipe|phở|bún|cơm|food|cuisine",
    "phim|movie|film|xem phim|cinema|entertainment",
    "âm nhạc|music|bài hát|song|concert|performance",
    "thể thao|sports|bóng đá|football|basketball|tennis",
    "chính trị|politics|bầu cử|election|government",
    "tin tức|news|báo|newspaper|headlines",
    "mua sắm|shopping|mua|buy|bán|sell|retail",
    "du lịch|travel|trip|vacation|nghỉ mát|tourism",
    "cá cược|betting|casino|gambling|lottery",
    "y tế|medical|health|bệnh viện|hospital|doctor",
    "xe cộ|car|motorcycle|traffic|giao thông",
];

pub const ACADEMIC_PATTERNS: &[&str] = &[
    "học phí|tuition|fee|cost|price|chi phí",
    "học bổng|scholarship|financial aid",
    "điểm chuẩn|admission score|cutoff",
    "điều kiện|requirement|eligibility",
    "thời gian|deadline|schedule|timeline",
    "chương trình|program|curriculum",
    "ngành|major|specialization",
    "campus|khuôn viên|facility",
    "thực tập|internship|ojt|on the job training",
    "việc làm|career|job|employment",
];

/// `(canonical name, alternatives)`; the canonical name is reported on a hit.
pub const PROGRAM_PATTERNS: &[(&str, &str)] = &[
    ("công nghệ thông tin", "công nghệ thông tin|information technology"),
    ("trí tuệ nhân tạo", "trí tuệ nhân tạo|artificial intelligence"),
    ("kỹ thuật phần mềm", "kỹ thuật phần mềm|software engineering"),
    ("quản trị kinh doanh", "quản trị kinh doanh|business administration|mba"),
    ("thiết kế đồ họa", "thiết kế đồ họa|graphic design"),
    ("digital marketing", "digital marketing"),
    ("an toàn thông tin", "an toàn thông tin|cybersecurity"),
    ("khoa học dữ liệu", "khoa học dữ liệu|data science"),
];

pub const CAMPUS_PATTERNS: &[(&str, &str)] = &[
    ("hà nội", "hà nội"),
    ("thành phố hồ chí minh", "thành phố hồ chí minh|ho chi minh"),
    ("đà nẵng", "đà nẵng"),
    ("cần thơ", "cần thơ"),
    ("hòa lạc", "hòa lạc"),
    ("quy nhơn", "quy nhơn"),
];
