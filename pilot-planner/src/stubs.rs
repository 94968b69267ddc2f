//! Offline snippets for common exercise prompts.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Task {
    Factorial,
    Fibonacci,
    Prime,
    Addition,
    BubbleSort,
    Hello,
}

/// Checked in order; the first phrase found in the prompt wins.
const TASK_PHRASES: [(&str, Task); 9] = [
    ("factorial", Task::Factorial),
    ("fibonacci", Task::Fibonacci),
    ("prime", Task::Prime),
    ("bubble sort", Task::BubbleSort),
    ("sort", Task::BubbleSort),
    ("addition", Task::Addition),
    ("add two", Task::Addition),
    ("sum", Task::Addition),
    ("hello", Task::Hello),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Lang {
    Python,
    JavaScript,
    Java,
    Cpp,
}

fn lang_of(language: &str) -> Option<Lang> {
    let l = language.trim().to_ascii_lowercase();
    match l.as_str() {
        "python" | "py" | "python3" => Some(Lang::Python),
        "javascript" | "js" | "node" | "typescript" | "ts" => Some(Lang::JavaScript),
        "java" => Some(Lang::Java),
        "c++" | "cpp" => Some(Lang::Cpp),
        _ => None,
    }
}

fn snippet(task: Task, lang: Lang) -> &'static str {
    match (task, lang) {
        (Task::Factorial, Lang::Python) => "def factorial(n):\n    return 1 if n <= 1 else n * factorial(n - 1)\n\nprint(factorial(5))\n",
        (Task::Factorial, Lang::JavaScript) => "function factorial(n) {\n  return n <= 1 ? 1 : n * factorial(n - 1);\n}\n\nconsole.log(factorial(5));\n",
        (Task::Factorial, Lang::Java) => "public class Main {\n    static long factorial(int n) {\n        return n <= 1 ? 1 : n * factorial(n - 1);\n    }\n\n    public static void main(String[] args) {\n        System.out.println(factorial(5));\n    }\n}\n",
        (Task::Factorial, Lang::Cpp) => "#include <iostream>\n\nlong factorial(int n) { return n <= 1 ? 1 : n * factorial(n - 1); }\n\nint main() {\n    std::cout << factorial(5) << std::endl;\n    return 0;\n}\n",

        (Task::Fibonacci, Lang::Python) => "a, b = 0, 1\nfor _ in range(10):\n    print(a)\n    a, b = b, a + b\n",
        (Task::Fibonacci, Lang::JavaScript) => "let a = 0, b = 1;\nfor (let i = 0; i < 10; i++) {\n  console.log(a);\n  [a, b] = [b, a + b];\n}\n",
        (Task::Fibonacci, Lang::Java) => "public class Main {\n    public static void main(String[] args) {\n        long a = 0, b = 1;\n        for (int i = 0; i < 10; i++) {\n            System.out.println(a);\n            long t = a + b;\n            a = b;\n            b = t;\n        }\n    }\n}\n",
        (Task::Fibonacci, Lang::Cpp) => "#include <iostream>\n\nint main() {\n    long a = 0, b = 1;\n    for (int i = 0; i < 10; i++) {\n        std::cout << a << std::endl;\n        long t = a + b;\n        a = b;\n        b = t;\n    }\n    return 0;\n}\n",

        (Task::Prime, Lang::Python) => "def is_prime(n):\n    if n < 2:\n        return False\n    i = 2\n    while i * i <= n:\n        if n % i == 0:\n            return False\n        i += 1\n    return True\n\nprint(is_prime(29))\n",
        (Task::Prime, Lang::JavaScript) => "function isPrime(n) {\n  if (n < 2) return false;\n  for (let i = 2; i * i <= n; i++) {\n    if (n % i === 0) return false;\n  }\n  return true;\n}\n\nconsole.log(isPrime(29));\n",
        (Task::Prime, Lang::Java) => "public class Main {\n    static boolean isPrime(int n) {\n        if (n < 2) return false;\n        for (int i = 2; i * i <= n; i++) {\n            if (n % i == 0) return false;\n        }\n        return true;\n    }\n\n    public static void main(String[] args) {\n        System.out.println(isPrime(29));\n    }\n}\n",
        (Task::Prime, Lang::Cpp) => "#include <iostream>\n\nbool isPrime(int n) {\n    if (n < 2) return false;\n    for (int i = 2; i * i <= n; i++) {\n        if (n % i == 0) return false;\n    }\n    return true;\n}\n\nint main() {\n    std::cout << std::boolalpha << isPrime(29) << std::endl;\n    return 0;\n}\n",

        (Task::Addition, Lang::Python) => "a = 2\nb = 3\nprint(a + b)\n",
        (Task::Addition, Lang::JavaScript) => "const a = 2;\nconst b = 3;\nconsole.log(a + b);\n",
        (Task::Addition, Lang::Java) => "public class Main {\n    public static void main(String[] args) {\n        int a = 2, b = 3;\n        System.out.println(a + b);\n    }\n}\n",
        (Task::Addition, Lang::Cpp) => "#include <iostream>\n\nint main() {\n    int a = 2, b = 3;\n    std::cout << a + b << std::endl;\n    return 0;\n}\n",

        (Task::BubbleSort, Lang::Python) => "def bubble_sort(arr):\n    n = len(arr)\n    for i in range(n):\n        for j in range(n - i - 1):\n            if arr[j] > arr[j + 1]:\n                arr[j], arr[j + 1] = arr[j + 1], arr[j]\n    return arr\n\nprint(bubble_sort([64, 34, 25, 12, 22, 11, 90]))\n",
        (Task::BubbleSort, Lang::JavaScript) => "function bubbleSort(arr) {\n  for (let i = 0; i < arr.length; i++) {\n    for (let j = 0; j < arr.length - i - 1; j++) {\n      if (arr[j] > arr[j + 1]) [arr[j], arr[j + 1]] = [arr[j + 1], arr[j]];\n    }\n  }\n  return arr;\n}\n\nconsole.log(bubbleSort([64, 34, 25, 12, 22, 11, 90]));\n",
        (Task::BubbleSort, Lang::Java) => "import java.util.Arrays;\n\npublic class Main {\n    public static void main(String[] args) {\n        int[] arr = {64, 34, 25, 12, 22, 11, 90};\n        for (int i = 0; i < arr.length; i++) {\n            for (int j = 0; j < arr.length - i - 1; j++) {\n                if (arr[j] > arr[j + 1]) {\n                    int t = arr[j];\n                    arr[j] = arr[j + 1];\n                    arr[j + 1] = t;\n                }\n            }\n        }\n        System.out.println(Arrays.toString(arr));\n    }\n}\n",
        (Task::BubbleSort, Lang::Cpp) => "#include <iostream>\n#include <utility>\n\nint main() {\n    int arr[] = {64, 34, 25, 12, 22, 11, 90};\n    int n = sizeof(arr) / sizeof(arr[0]);\n    for (int i = 0; i < n; i++)\n        for (int j = 0; j < n - i - 1; j++)\n            if (arr[j] > arr[j + 1]) std::swap(arr[j], arr[j + 1]);\n    for (int x : arr) std::cout << x << ' ';\n    std::cout << std::endl;\n    return 0;\n}\n",

        (Task::Hello, Lang::Python) => "print('Hello, World!')\n",
        (Task::Hello, Lang::JavaScript) => "console.log('Hello, World!');\n",
        (Task::Hello, Lang::Java) => "public class Main {\n    public static void main(String[] args) {\n        System.out.println(\"Hello, World!\");\n    }\n}\n",
        (Task::Hello, Lang::Cpp) => "#include <iostream>\n\nint main() {\n    std::cout << \"Hello, World!\" << std::endl;\n    return 0;\n}\n",
    }
}

/// Snippet for a recognized task phrase in a known language.
pub fn lookup(language: &str, prompt: &str) -> Option<&'static str> {
    let lower = prompt.to_lowercase();
    let task = TASK_PHRASES
        .iter()
        .find(|(phrase, _)| lower.contains(phrase))
        .map(|(_, task)| *task)?;
    Some(snippet(task, lang_of(language)?))
}

/// Always returns something runnable or at least harmless.
pub fn stub_for(language: &str, prompt: &str) -> String {
    if let Some(code) = lookup(language, prompt) {
        return code.to_string();
    }
    match lang_of(language) {
        Some(lang) => snippet(Task::Hello, lang).to_string(),
        None if language.trim().is_empty() => snippet(Task::Hello, Lang::Python).to_string(),
        None => format!("// {}\n", prompt.trim()),
    }
}
